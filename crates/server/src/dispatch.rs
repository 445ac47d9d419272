//! Command dispatcher
//!
//! Maps a decoded request to its handler and turns every domain-level
//! failure into a wire `Failure` response. The only errors that escape
//! [`Dispatcher::dispatch`] are unanticipated internal ones (a panicked
//! blocking task, for instance); the connection handler converts those to
//! a wire `Error` at its boundary.

use anyhow::{Context, Result};
use common::{AttachExecutor, DeviceRegistry};
use protocol::{AttachArgs, CommandRequest, CommandResponse, DeviceDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::matcher::{MatchOutcome, Selector, match_devices};

pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
    executor: Arc<dyn AttachExecutor>,
    /// Ceiling on each collaborator call (enumeration, attach); the
    /// blocking work itself cannot be cancelled mid-flight, but the
    /// response to the client is bounded
    operation_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        executor: Arc<dyn AttachExecutor>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            executor,
            operation_timeout,
        }
    }

    /// Route one request to its handler
    pub async fn dispatch(&self, request: CommandRequest) -> Result<CommandResponse> {
        match request {
            CommandRequest::List => self.handle_list().await,
            CommandRequest::Attach(args) => self.handle_attach(args).await,
        }
    }

    async fn handle_list(&self) -> Result<CommandResponse> {
        Ok(match self.snapshot().await? {
            Some(Ok(devices)) => {
                debug!("list: {} device(s)", devices.len());
                CommandResponse::devices(devices)
            }
            Some(Err(e)) => CommandResponse::failure(e.to_string()),
            None => CommandResponse::failure("timed out waiting for device enumeration"),
        })
    }

    async fn handle_attach(&self, args: AttachArgs) -> Result<CommandResponse> {
        let selector = match Selector::parse(&args) {
            Ok(selector) => selector,
            Err(e) => return Ok(CommandResponse::failure(e.to_string())),
        };

        let snapshot = match self.snapshot().await? {
            Some(Ok(devices)) => devices,
            Some(Err(e)) => return Ok(CommandResponse::failure(e.to_string())),
            None => {
                return Ok(CommandResponse::failure(
                    "timed out waiting for device enumeration",
                ));
            }
        };

        let device = match match_devices(&snapshot, &selector, args.first) {
            MatchOutcome::One(device) => device,
            MatchOutcome::NoMatch => {
                return Ok(CommandResponse::failure("no matching device"));
            }
            MatchOutcome::Ambiguous(candidates) => {
                return Ok(CommandResponse::failure(format!(
                    "ambiguous match ({} candidates)",
                    candidates.len()
                )));
            }
        };

        info!(bus_id = %device.bus_id, id = %device.usb_id(), "attaching device");
        Ok(match self.execute_attach(device).await? {
            Some(Ok(())) => CommandResponse::ok(),
            Some(Err(e)) => CommandResponse::failure(e.to_string()),
            None => CommandResponse::failure("timed out waiting for attach"),
        })
    }

    /// Take a fresh registry snapshot on the blocking pool
    ///
    /// Enumeration may spawn an external process or probe hardware, so it
    /// never runs on the async worker threads. `None` means the timeout
    /// elapsed first.
    async fn snapshot(&self) -> Result<Option<common::Result<Vec<DeviceDescriptor>>>> {
        let registry = self.registry.clone();
        let task = tokio::task::spawn_blocking(move || registry.snapshot());
        match timeout(self.operation_timeout, task).await {
            Ok(joined) => joined.context("snapshot task failed").map(Some),
            Err(_) => {
                warn!("enumeration exceeded {:?}", self.operation_timeout);
                Ok(None)
            }
        }
    }

    async fn execute_attach(&self, device: DeviceDescriptor) -> Result<Option<common::Result<()>>> {
        let executor = self.executor.clone();
        let task = tokio::task::spawn_blocking(move || executor.attach(&device));
        match timeout(self.operation_timeout, task).await {
            Ok(joined) => joined.context("attach task failed").map(Some),
            Err(_) => {
                warn!("attach exceeded {:?}", self.operation_timeout);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{DetailProvider, DeviceDetails, DeviceEnumerator, Error, RawDevice};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEnumerator {
        devices: Vec<RawDevice>,
        fail: bool,
    }

    impl DeviceEnumerator for FakeEnumerator {
        fn enumerate(&self) -> common::Result<Vec<RawDevice>> {
            if self.fail {
                return Err(Error::Enumeration("usbip exited with status 1".to_string()));
            }
            Ok(self.devices.clone())
        }
    }

    struct FakeProvider;

    impl DetailProvider for FakeProvider {
        fn details(&self, raw: &RawDevice) -> common::Result<DeviceDetails> {
            Ok(DeviceDetails {
                description: format!("Device at {}", raw.bus_id),
                ..DeviceDetails::default()
            })
        }
    }

    struct FakeExecutor {
        calls: AtomicUsize,
        fail: bool,
    }

    impl AttachExecutor for FakeExecutor {
        fn attach(&self, _device: &DeviceDescriptor) -> common::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Attach("bind refused".to_string()));
            }
            Ok(())
        }
    }

    fn raw(bus_id: &str, vendor: u16, product: u16) -> RawDevice {
        RawDevice {
            bus_id: bus_id.parse().unwrap(),
            vendor_id: vendor,
            product_id: product,
        }
    }

    fn dispatcher(devices: Vec<RawDevice>, enumeration_fails: bool, attach_fails: bool) -> Dispatcher {
        let registry = DeviceRegistry::new(
            Box::new(FakeEnumerator {
                devices,
                fail: enumeration_fails,
            }),
            Box::new(FakeProvider),
        );
        Dispatcher::new(
            Arc::new(registry),
            Arc::new(FakeExecutor {
                calls: AtomicUsize::new(0),
                fail: attach_fails,
            }),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_list_returns_snapshot() {
        let d = dispatcher(vec![raw("1-2", 0x0bda, 0x5400)], false, false);
        let response = d.dispatch(CommandRequest::List).await.unwrap();
        let CommandResponse::Success { data } = response else {
            panic!("expected success, got {:?}", response);
        };
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].bus_id.to_string(), "1-2");
    }

    #[tokio::test]
    async fn test_list_enumeration_failure_is_business_failure() {
        let d = dispatcher(vec![], true, false);
        let response = d.dispatch(CommandRequest::List).await.unwrap();
        let CommandResponse::Failure { message } = response else {
            panic!("expected failure, got {:?}", response);
        };
        assert!(message.unwrap().contains("enumeration failed"));
    }

    #[tokio::test]
    async fn test_attach_success() {
        let d = dispatcher(vec![raw("1-2", 0x0bda, 0x5400)], false, false);
        let response = d
            .dispatch(CommandRequest::Attach(AttachArgs {
                id: Some("0bda:5400".to_string()),
                ..AttachArgs::default()
            }))
            .await
            .unwrap();
        assert_eq!(response, CommandResponse::ok());
    }

    #[tokio::test]
    async fn test_attach_no_match() {
        let d = dispatcher(vec![raw("1-2", 0x0bda, 0x5400)], false, false);
        let response = d
            .dispatch(CommandRequest::Attach(AttachArgs {
                id: Some("ffff:ffff".to_string()),
                ..AttachArgs::default()
            }))
            .await
            .unwrap();
        assert_eq!(response, CommandResponse::failure("no matching device"));
    }

    #[tokio::test]
    async fn test_attach_empty_selector() {
        let d = dispatcher(vec![raw("1-2", 0x0bda, 0x5400)], false, false);
        let response = d
            .dispatch(CommandRequest::Attach(AttachArgs::default()))
            .await
            .unwrap();
        let CommandResponse::Failure { message } = response else {
            panic!("expected failure, got {:?}", response);
        };
        assert!(message.unwrap().contains("invalid selector"));
    }

    #[tokio::test]
    async fn test_attach_ambiguous_without_first() {
        let d = dispatcher(
            vec![raw("1-2", 0x0bda, 0x5400), raw("2-1", 0x0bda, 0x5400)],
            false,
            false,
        );
        let response = d
            .dispatch(CommandRequest::Attach(AttachArgs {
                id: Some("0bda:5400".to_string()),
                ..AttachArgs::default()
            }))
            .await
            .unwrap();
        let CommandResponse::Failure { message } = response else {
            panic!("expected failure, got {:?}", response);
        };
        assert!(message.unwrap().contains("ambiguous match"));
    }

    #[tokio::test]
    async fn test_attach_ambiguous_with_first_succeeds() {
        let d = dispatcher(
            vec![raw("1-2", 0x0bda, 0x5400), raw("2-1", 0x0bda, 0x5400)],
            false,
            false,
        );
        let response = d
            .dispatch(CommandRequest::Attach(AttachArgs {
                id: Some("0bda:5400".to_string()),
                first: true,
                ..AttachArgs::default()
            }))
            .await
            .unwrap();
        assert_eq!(response, CommandResponse::ok());
    }

    #[tokio::test]
    async fn test_slow_enumeration_times_out_as_failure() {
        struct SlowEnumerator;

        impl DeviceEnumerator for SlowEnumerator {
            fn enumerate(&self) -> common::Result<Vec<RawDevice>> {
                std::thread::sleep(std::time::Duration::from_millis(200));
                Ok(vec![])
            }
        }

        let registry = DeviceRegistry::new(Box::new(SlowEnumerator), Box::new(FakeProvider));
        let d = Dispatcher::new(
            Arc::new(registry),
            Arc::new(FakeExecutor {
                calls: AtomicUsize::new(0),
                fail: false,
            }),
            Duration::from_millis(20),
        );

        let response = d.dispatch(CommandRequest::List).await.unwrap();
        let CommandResponse::Failure { message } = response else {
            panic!("expected failure, got {:?}", response);
        };
        assert!(message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_attach_executor_failure_is_business_failure() {
        let d = dispatcher(vec![raw("1-2", 0x0bda, 0x5400)], false, true);
        let response = d
            .dispatch(CommandRequest::Attach(AttachArgs {
                bus: Some("1-2".to_string()),
                ..AttachArgs::default()
            }))
            .await
            .unwrap();
        let CommandResponse::Failure { message } = response else {
            panic!("expected failure, got {:?}", response);
        };
        assert!(message.unwrap().contains("bind refused"));
    }
}
