//! Integration tests for the scan-and-fix pass
//!
//! Drives `run` against the in-memory bus, covering:
//! - Idempotent apply (no write when already configured)
//! - Partial failure isolation across devices
//! - Zero-match handling and exit status
//! - Devices vanishing between locate and apply

use common::test_utils::{FakeBus, FakeDevice};
use common::{
    ApplyError, ConfigurationRequest, ConfigurationResult, DeviceIdentity, RunError,
    TransportError,
};
use configurator::report::ExitStatus;
use configurator::runner::{RunOptions, run};
use configurator::usb::{apply, locate};

fn id(bus: u8, address: u8) -> DeviceIdentity {
    DeviceIdentity::new(bus, address)
}

fn options(name: &str, configuration: u8) -> RunOptions {
    RunOptions {
        device_name: name.to_string(),
        desired_configuration: configuration,
        filters: Vec::new(),
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn test_two_adapters_one_needs_switching() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 1),
            FakeDevice::new(2, 7, "AX88179A", 2),
        ]);

        let result = run(&bus, &options("AX88179A", 2));
        let outcomes = result.as_ref().unwrap();

        let summary: Vec<_> = outcomes
            .iter()
            .map(|o| (o.identity, o.result.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (id(1, 4), ConfigurationResult::Applied),
                (id(2, 7), ConfigurationResult::Unchanged),
            ]
        );
        assert_eq!(bus.writes_to(id(1, 4)), 1);
        assert_eq!(bus.writes_to(id(2, 7)), 0);
        assert_eq!(ExitStatus::from_run(&result, false).code(), 0);
    }

    #[test]
    fn test_no_such_device() {
        let bus = FakeBus::new(vec![FakeDevice::new(1, 4, "AX88179A", 1)]);

        let result = run(&bus, &options("NoSuchDevice", 2));

        assert!(matches!(result, Err(RunError::NoDevicesFound { .. })));
        assert_eq!(bus.total_writes(), 0);
        assert_ne!(ExitStatus::from_run(&result, false).code(), 0);
    }

    #[test]
    fn test_empty_bus_is_safe_to_rerun() {
        let bus = FakeBus::new(vec![]);

        for _ in 0..3 {
            let result = run(&bus, &options("AX88179A", 2));
            assert_eq!(ExitStatus::from_run(&result, true), ExitStatus::Success);
        }
        assert_eq!(bus.opens(), 0);
    }
}

mod idempotence {
    use super::*;

    #[test]
    fn test_second_run_is_unchanged() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 1),
            FakeDevice::new(1, 5, "AX88179A", 1),
            FakeDevice::new(2, 7, "AX88179A", 2),
        ]);

        run(&bus, &options("AX88179A", 2)).unwrap();
        let writes_after_first = bus.total_writes();

        let second = run(&bus, &options("AX88179A", 2)).unwrap();

        assert!(
            second
                .iter()
                .all(|o| o.result == ConfigurationResult::Unchanged)
        );
        assert_eq!(bus.total_writes(), writes_after_first);
    }

    #[test]
    fn test_already_configured_never_written() {
        let bus = FakeBus::new(vec![FakeDevice::new(1, 4, "AX88179A", 2)]);

        let outcome = apply(&bus, &ConfigurationRequest::new(id(1, 4), 2));

        assert_eq!(outcome.result, ConfigurationResult::Unchanged);
        assert_eq!(bus.total_writes(), 0);
    }
}

mod failure_isolation {
    use super::*;

    #[test]
    fn test_middle_device_failure_does_not_stop_others() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 1),
            FakeDevice::new(1, 5, "AX88179A", 1).failing_write(TransportError::Stall),
            FakeDevice::new(1, 6, "AX88179A", 1),
        ]);

        let result = run(&bus, &options("AX88179A", 2));
        let outcomes = result.as_ref().unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result, ConfigurationResult::Applied);
        assert_eq!(
            outcomes[1].result,
            ConfigurationResult::Failed(ApplyError::Transport(TransportError::Stall))
        );
        assert_eq!(outcomes[2].result, ConfigurationResult::Applied);
        assert_eq!(bus.configuration_of(id(1, 6)), Some(2));
        assert_eq!(
            ExitStatus::from_run(&result, false),
            ExitStatus::DeviceFailed
        );
    }

    #[test]
    fn test_permission_denied_is_per_device() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 1).failing_open(TransportError::PermissionDenied),
            FakeDevice::new(1, 5, "AX88179A", 1),
        ]);

        let result = run(&bus, &options("AX88179A", 2));
        let outcomes = result.as_ref().unwrap();

        assert_eq!(
            outcomes[0].result,
            ConfigurationResult::Failed(ApplyError::PermissionDenied)
        );
        assert_eq!(outcomes[1].result, ConfigurationResult::Applied);
        assert_eq!(
            ExitStatus::from_run(&result, false),
            ExitStatus::PermissionDenied
        );
    }

    #[test]
    fn test_handles_released_on_every_path() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 2),
            FakeDevice::new(1, 5, "AX88179A", 1).failing_read(TransportError::Timeout),
            FakeDevice::new(1, 6, "AX88179A", 1).failing_write(TransportError::Busy),
            FakeDevice::new(1, 7, "AX88179A", 1),
        ]);

        run(&bus, &options("AX88179A", 2)).unwrap();

        assert_eq!(bus.opens(), 4);
        assert_eq!(bus.releases(), 4);
    }

    #[test]
    fn test_enumeration_failure() {
        let bus = FakeBus::new(vec![FakeDevice::new(1, 4, "AX88179A", 1)]);
        bus.fail_enumeration(TransportError::Other("libusb init failed".to_string()));

        let result = run(&bus, &options("AX88179A", 2));

        assert!(matches!(result, Err(RunError::Enumeration(_))));
        assert_eq!(
            ExitStatus::from_run(&result, true),
            ExitStatus::DeviceFailed
        );
    }
}

mod reresolution {
    use super::*;

    #[test]
    fn test_device_unplugged_between_locate_and_apply() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 1),
            FakeDevice::new(1, 5, "AX88179A", 1),
        ]);

        let located = locate(&bus, "AX88179A", &[]).unwrap();
        bus.unplug(id(1, 4));

        let outcomes: Vec<_> = located
            .iter()
            .map(|d| apply(&bus, &ConfigurationRequest::new(d.identity, 2)))
            .collect();

        assert_eq!(
            outcomes[0].result,
            ConfigurationResult::Failed(ApplyError::DeviceVanished)
        );
        assert_eq!(outcomes[1].result, ConfigurationResult::Applied);
    }

    #[test]
    fn test_apply_reads_live_configuration_not_snapshot() {
        let bus = FakeBus::new(vec![FakeDevice::new(1, 4, "AX88179A", 1)]);

        let located = locate(&bus, "AX88179A", &[]).unwrap();
        assert_eq!(located[0].active_configuration, 1);

        // Something else switches the device after the snapshot was taken
        run(&bus, &options("AX88179A", 2)).unwrap();

        let outcome = apply(&bus, &ConfigurationRequest::new(located[0].identity, 2));
        assert_eq!(outcome.result, ConfigurationResult::Unchanged);
        assert_eq!(outcome.previous_configuration, Some(2));
        assert_eq!(located[0].active_configuration, 1);
    }

    #[test]
    fn test_unreadable_devices_are_not_candidates() {
        let bus = FakeBus::new(vec![
            FakeDevice::unreadable(1, 3, 1),
            FakeDevice::new(1, 4, "AX88179A", 1),
        ]);

        let outcomes = run(&bus, &options("AX88179A", 2)).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].identity, id(1, 4));
        assert_eq!(bus.configuration_of(id(1, 3)), Some(1));
    }
}

mod filters {
    use super::*;
    use configurator::usb::filter::parse_filters;

    #[test]
    fn test_filters_narrow_matches() {
        let bus = FakeBus::new(vec![
            FakeDevice::new(1, 4, "AX88179A", 1),
            FakeDevice::new(1, 5, "AX88179A clone", 1).with_ids(0x1234, 0x5678),
        ]);

        let run_options = RunOptions {
            filters: parse_filters(&["0x0b95:0x1790"]).unwrap(),
            ..options("AX88179A", 2)
        };
        let outcomes = run(&bus, &run_options).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].identity, id(1, 4));
        assert_eq!(bus.configuration_of(id(1, 5)), Some(1));
    }

    #[test]
    fn test_filters_excluding_everything_means_no_devices() {
        let bus = FakeBus::new(vec![FakeDevice::new(1, 4, "AX88179A", 1)]);

        let run_options = RunOptions {
            filters: parse_filters(&["0xffff:*"]).unwrap(),
            ..options("AX88179A", 2)
        };

        assert!(matches!(
            run(&bus, &run_options),
            Err(RunError::NoDevicesFound { .. })
        ));
    }
}
