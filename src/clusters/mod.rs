//! Typed cluster access on top of the raw interaction model.
//!
//! [Attribute] and [Command] are the primitives the per-cluster wrapper
//! modules are generated from: an attribute knows its cluster and attribute
//! id and the Rust type of its value, a command knows its cluster and
//! command id. Both take the endpoint at call time and go through
//! [MatterController] for transport.

pub mod helpers;
pub mod microwave_oven_mode;
pub mod on_off;
pub mod timer;

use std::marker::PhantomData;
use std::time::Duration;

use crate::controller::MatterController;
use crate::error::{Error, Result};
use crate::interaction::{InvokeRequest, InvokeResponse, ReadData, ReadRequest, ReadResponse, WriteRequest};
use crate::path::{AttributePath, CommandPath};
use crate::subscription::{SubscribeRequest, Subscription, SubscriptionState};
use crate::tlv::{decode_anonymous, encode_anonymous, TlvDecode, TlvEncode};

/// One attribute definition of a cluster. Constructed `const` in the cluster
/// modules.
pub struct Attribute<T> {
    cluster_id: u32,
    attribute_id: u32,
    _marker: PhantomData<fn() -> T>,
}

/// Pull the typed value for `path` out of a read response or update batch.
fn decode_attribute<T: TlvDecode>(response: &ReadResponse, path: AttributePath) -> Result<T> {
    if response.successes.is_empty() {
        return Err(Error::NoReadData {
            failures: response.failures.clone(),
        });
    }
    match response.attribute(path.attribute_id) {
        Some(ReadData::Attribute { data, .. }) => Ok(decode_anonymous(data)?),
        _ => Err(Error::AttributeMissing { path }),
    }
}

impl<T> Attribute<T> {
    pub const fn new(cluster_id: u32, attribute_id: u32) -> Self {
        Self {
            cluster_id,
            attribute_id,
            _marker: PhantomData,
        }
    }

    pub fn path(&self, endpoint_id: u16) -> AttributePath {
        AttributePath::new(endpoint_id, self.cluster_id, self.attribute_id)
    }
}

impl<T: TlvDecode> Attribute<T> {
    pub async fn read(&self, controller: &dyn MatterController, endpoint_id: u16) -> Result<T> {
        let path = self.path(endpoint_id);
        log::debug!("read {}", path);
        let response = controller.read(ReadRequest::attributes(vec![path])).await?;
        decode_attribute(&response, path)
    }

    pub async fn subscribe(
        &self,
        controller: &dyn MatterController,
        endpoint_id: u16,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Result<AttributeSubscription<T>> {
        let path = self.path(endpoint_id);
        let inner = controller
            .subscribe(SubscribeRequest::attributes(
                vec![path],
                min_interval,
                max_interval,
            ))
            .await?;
        Ok(AttributeSubscription {
            inner,
            path,
            _marker: PhantomData,
        })
    }
}

impl<T: TlvEncode> Attribute<T> {
    pub async fn write(
        &self,
        controller: &dyn MatterController,
        endpoint_id: u16,
        value: &T,
        timed: Option<Duration>,
    ) -> Result<()> {
        let path = self.path(endpoint_id);
        log::debug!("write {} (timed: {:?})", path, timed);
        let response = controller
            .write(WriteRequest {
                path,
                tlv_payload: encode_anonymous(value)?,
                timed,
            })
            .await?;
        if let Some(failure) = response.failure_for(&path) {
            return Err(Error::Write(failure.clone()));
        }
        Ok(())
    }
}

/// One command definition of a cluster. The payload is built by the cluster
/// wrapper, always an anonymous structure of context-tagged fields.
pub struct Command {
    cluster_id: u32,
    command_id: u32,
}

impl Command {
    pub const fn new(cluster_id: u32, command_id: u32) -> Self {
        Self {
            cluster_id,
            command_id,
        }
    }

    pub fn path(&self, endpoint_id: u16) -> CommandPath {
        CommandPath::new(endpoint_id, self.cluster_id, self.command_id)
    }

    pub async fn invoke(
        &self,
        controller: &dyn MatterController,
        endpoint_id: u16,
        tlv_payload: Vec<u8>,
        timed: Option<Duration>,
    ) -> Result<InvokeResponse> {
        let path = self.path(endpoint_id);
        log::debug!("invoke {} ({} payload bytes)", path, tlv_payload.len());
        controller
            .invoke(InvokeRequest {
                path,
                tlv_payload,
                timed,
            })
            .await
    }
}

/// State event on a typed attribute subscription.
#[derive(Debug)]
pub enum AttributeState<T> {
    Established,
    Value(T),
    Error(Error),
}

/// Typed view over a [Subscription], filtered to one attribute and decoded
/// on the fly. An update batch that does not carry the attribute is skipped,
/// the subscriber keeps its previous value; a payload that fails to decode
/// terminates the subscription.
pub struct AttributeSubscription<T> {
    inner: Subscription,
    path: AttributePath,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TlvDecode> AttributeSubscription<T> {
    pub fn id(&self) -> u32 {
        self.inner.id()
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub async fn next(&mut self) -> Option<AttributeState<T>> {
        loop {
            return Some(match self.inner.next().await? {
                SubscriptionState::Established => AttributeState::Established,
                SubscriptionState::Error(e) => AttributeState::Error(e.into()),
                SubscriptionState::Update(batch) => match batch.attribute(self.path.attribute_id) {
                    Some(ReadData::Attribute { data, .. }) => match decode_anonymous::<T>(data) {
                        Ok(value) => AttributeState::Value(value),
                        Err(e) => {
                            self.inner.cancel();
                            AttributeState::Error(e.into())
                        }
                    },
                    _ => {
                        log::debug!(
                            "subscription {}: update without {}, keeping previous value",
                            self.inner.id(),
                            self.path
                        );
                        continue;
                    }
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{AttributeWriteError, ReadFailure, Status, WriteResponse};
    use crate::subscription::{SubscriptionEngine, SubscriptionError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Controller double fed with canned responses, recording requests.
    struct ScriptedController {
        reads: Mutex<VecDeque<ReadResponse>>,
        write_failures: Vec<AttributeWriteError>,
        writes: Mutex<Vec<WriteRequest>>,
        invokes: Mutex<Vec<InvokeRequest>>,
        invoke_payload: Vec<u8>,
        engine: SubscriptionEngine,
    }

    impl ScriptedController {
        fn new() -> Self {
            Self {
                reads: Mutex::new(VecDeque::new()),
                write_failures: Vec::new(),
                writes: Mutex::new(Vec::new()),
                invokes: Mutex::new(Vec::new()),
                invoke_payload: Vec::new(),
                engine: SubscriptionEngine::new(),
            }
        }

        fn with_read(self, response: ReadResponse) -> Self {
            self.reads.lock().unwrap().push_back(response);
            self
        }
    }

    #[async_trait]
    impl MatterController for ScriptedController {
        async fn read(&self, _request: ReadRequest) -> Result<ReadResponse> {
            Ok(self.reads.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn write(&self, request: WriteRequest) -> Result<WriteResponse> {
            self.writes.lock().unwrap().push(request);
            Ok(WriteResponse {
                failures: self.write_failures.clone(),
            })
        }

        async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse> {
            self.invokes.lock().unwrap().push(request);
            Ok(InvokeResponse {
                payload: self.invoke_payload.clone(),
            })
        }

        async fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription> {
            Ok(self.engine.register(&request)?)
        }
    }

    const ON_OFF: Attribute<bool> = Attribute::new(0x0006, 0x0000);

    fn attribute_entry(path: AttributePath, data: Vec<u8>) -> ReadData {
        ReadData::Attribute { path, data }
    }

    #[tokio::test]
    async fn test_typed_read() {
        let path = ON_OFF.path(1);
        let controller = ScriptedController::new().with_read(ReadResponse {
            successes: vec![attribute_entry(path, encode_anonymous(&true).unwrap())],
            failures: vec![],
        });
        assert!(ON_OFF.read(&controller, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_without_data_fails() {
        let controller = ScriptedController::new().with_read(ReadResponse {
            successes: vec![],
            failures: vec![ReadFailure::Attribute {
                path: ON_OFF.path(1),
                status: Status::UnsupportedAttribute,
            }],
        });
        match ON_OFF.read(&controller, 1).await {
            Err(Error::NoReadData { failures }) => assert_eq!(failures.len(), 1),
            other => panic!("expected NoReadData, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_read_missing_attribute_fails() {
        // response carries data, just not for the requested attribute
        let other = AttributePath::new(1, 0x0006, 0x4001);
        let controller = ScriptedController::new().with_read(ReadResponse {
            successes: vec![attribute_entry(other, encode_anonymous(&0u16).unwrap())],
            failures: vec![],
        });
        match ON_OFF.read(&controller, 1).await {
            Err(Error::AttributeMissing { path }) => assert_eq!(path, ON_OFF.path(1)),
            other => panic!("expected AttributeMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_typed_write_and_rejection() {
        const ON_TIME: Attribute<u16> = Attribute::new(0x0006, 0x4001);
        let controller = ScriptedController::new();
        ON_TIME.write(&controller, 1, &300, None).await.unwrap();
        {
            let writes = controller.writes.lock().unwrap();
            assert_eq!(writes[0].path, ON_TIME.path(1));
            assert_eq!(writes[0].tlv_payload, encode_anonymous(&300u16).unwrap());
            assert!(writes[0].timed.is_none());
        }

        let mut controller = ScriptedController::new();
        controller.write_failures = vec![AttributeWriteError {
            path: ON_TIME.path(1),
            status: Status::UnsupportedWrite,
        }];
        match ON_TIME.write(&controller, 1, &300, None).await {
            Err(Error::Write(failure)) => assert_eq!(failure.status, Status::UnsupportedWrite),
            other => panic!("expected Write error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_timed_invoke_plumbing() {
        const TOGGLE: Command = Command::new(0x0006, 2);
        let controller = ScriptedController::new();
        TOGGLE
            .invoke(&controller, 1, vec![0x15, 0x18], Some(Duration::from_millis(500)))
            .await
            .unwrap();
        let invokes = controller.invokes.lock().unwrap();
        assert_eq!(invokes[0].path, TOGGLE.path(1));
        assert_eq!(invokes[0].timed, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_typed_subscription_flow() {
        let controller = ScriptedController::new();
        let mut sub = ON_OFF
            .subscribe(
                &controller,
                1,
                Duration::from_secs(1),
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        let id = sub.id();
        let path = ON_OFF.path(1);

        controller.engine.establish(id).await.unwrap();
        controller
            .engine
            .update(
                id,
                ReadResponse {
                    successes: vec![attribute_entry(path, encode_anonymous(&true).unwrap())],
                    failures: vec![],
                },
            )
            .await
            .unwrap();
        // batch without our attribute, consumer keeps the previous value
        controller
            .engine
            .update(
                id,
                ReadResponse {
                    successes: vec![attribute_entry(
                        AttributePath::new(1, 0x0006, 0x4001),
                        encode_anonymous(&7u16).unwrap(),
                    )],
                    failures: vec![],
                },
            )
            .await
            .unwrap();
        controller
            .engine
            .update(
                id,
                ReadResponse {
                    successes: vec![attribute_entry(path, encode_anonymous(&false).unwrap())],
                    failures: vec![],
                },
            )
            .await
            .unwrap();
        controller.engine.fail(id, 3).await.unwrap();

        assert!(matches!(sub.next().await, Some(AttributeState::Established)));
        assert!(matches!(sub.next().await, Some(AttributeState::Value(true))));
        // the empty batch is skipped, the next event is already the second value
        assert!(matches!(sub.next().await, Some(AttributeState::Value(false))));
        match sub.next().await {
            Some(AttributeState::Error(Error::Subscription(SubscriptionError::Terminated {
                cause,
            }))) => assert_eq!(cause, 3),
            _ => panic!("expected terminal error"),
        }
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_decode_failure_terminates() {
        let controller = ScriptedController::new();
        let mut sub = ON_OFF
            .subscribe(
                &controller,
                1,
                Duration::from_secs(1),
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        let id = sub.id();

        controller.engine.establish(id).await.unwrap();
        // a u16 payload where a bool is expected
        controller
            .engine
            .update(
                id,
                ReadResponse {
                    successes: vec![attribute_entry(
                        ON_OFF.path(1),
                        encode_anonymous(&7u16).unwrap(),
                    )],
                    failures: vec![],
                },
            )
            .await
            .unwrap();

        assert!(matches!(sub.next().await, Some(AttributeState::Established)));
        assert!(matches!(
            sub.next().await,
            Some(AttributeState::Error(Error::Format(_)))
        ));
        // cancellation propagated to the producer side
        let err = controller
            .engine
            .update(id, ReadResponse::default())
            .await
            .unwrap_err();
        assert_eq!(err, SubscriptionError::NotActive(id));
    }
}
