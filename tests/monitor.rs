#[cfg(test)]
mod tests {
    use muxio::{Error, Interest, Selector};

    use std::io::Write;
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");

        let client = TcpStream::connect(addr).expect("Failed to connect to listener");
        let (server, _) = listener.accept().expect("Failed to accept connection");

        (client, server)
    }

    #[test]
    fn test_fresh_monitor_has_no_readiness() {
        let (a, _b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        assert!(!monitor.is_closed());
        assert_eq!(monitor.readiness().unwrap(), None);
        assert!(!monitor.is_readable());
        assert!(!monitor.is_writable());
        assert_eq!(monitor.interests().unwrap(), Interest::Read);
    }

    #[test]
    fn test_interests_reflect_the_sloppy_union() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let selector: Selector = Selector::new().expect("Failed to open selector");

        // A listener cannot be written to; the write half of the union is
        // silently dropped rather than rejected.
        let monitor = selector
            .register(&listener, Interest::ReadWrite)
            .expect("Failed to register");
        assert_eq!(monitor.interests().unwrap(), Interest::Read);

        // Asking for the unsupported direction alone does fail.
        let other = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        assert!(matches!(
            selector.register(&other, Interest::Write),
            Err(Error::UnsupportedInterest {
                interest: Interest::Write
            })
        ));
    }

    #[test]
    fn test_set_interests_reapplies_the_registration() {
        let (a, _b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        monitor
            .set_interests(Interest::ReadWrite)
            .expect("Failed to update interests");
        assert_eq!(monitor.interests().unwrap(), Interest::ReadWrite);

        // A connected stream is immediately writable.
        let ready = selector
            .select(Some(Duration::from_secs(1)))
            .expect("select failed");
        assert!(ready.contains(&monitor));
        assert!(monitor.is_writable());
        assert!(!monitor.is_readable());
    }

    #[test]
    fn test_closing_a_monitor_deregisters_it() {
        let (a, mut b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        monitor.close();
        assert!(monitor.is_closed());
        assert_eq!(selector.registered(&a).unwrap(), Some(false));

        // Closing again is a no-op.
        monitor.close();
        assert!(monitor.is_closed());

        b.write_all(b"hi!").expect("Failed to write");
        let ready = selector
            .select(Some(Duration::from_millis(100)))
            .expect("select failed");
        assert!(ready.is_empty());
    }

    #[test]
    fn test_closed_monitor_rejects_new_interests_but_keeps_last_values() {
        let (a, mut b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        b.write_all(b"hi!").expect("Failed to write");
        let ready = selector
            .select(Some(Duration::from_secs(1)))
            .expect("select failed");
        assert!(ready.contains(&monitor));

        monitor.close();

        assert!(matches!(
            monitor.set_interests(Interest::Write),
            Err(Error::ClosedMonitor)
        ));

        // Last observed state stays queryable.
        assert_eq!(monitor.readiness().unwrap(), Some(Interest::Read));
        assert!(monitor.is_readable());
        assert_eq!(monitor.interests().unwrap(), Interest::Read);
    }

    #[test]
    fn test_value_slot_round_trips() {
        let (a, _b) = tcp_pair();
        let selector: Selector<String> = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        assert_eq!(monitor.value(), None);

        monitor.set_value("first".to_owned());
        assert_eq!(monitor.value().as_deref(), Some("first"));

        monitor.set_value("second".to_owned());
        assert_eq!(monitor.value().as_deref(), Some("second"));

        assert_eq!(monitor.take_value().as_deref(), Some("second"));
        assert_eq!(monitor.value(), None);
    }

    #[test]
    fn test_monitor_handles_compare_by_registration() {
        let (a, mut b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");
        let handle = monitor.clone();
        assert_eq!(monitor, handle);

        b.write_all(b"hi!").expect("Failed to write");
        let ready = selector
            .select(Some(Duration::from_secs(1)))
            .expect("select failed");
        assert!(ready.contains(&handle));

        // The clone observes the same readiness.
        assert!(handle.is_readable());
    }

    #[test]
    fn test_monitor_points_back_at_its_selector() {
        let (a, _b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        let owner = monitor.selector().expect("selector should still be alive");
        assert_eq!(owner.registered(&a).unwrap(), Some(true));

        drop(owner);
        drop(selector);
        assert!(monitor.selector().is_none());
    }

    #[test]
    fn test_selector_close_closes_outstanding_monitors() {
        let (a, _b) = tcp_pair();
        let selector: Selector = Selector::new().expect("Failed to open selector");

        let monitor = selector
            .register(&a, Interest::Read)
            .expect("Failed to register");

        selector.close();

        assert!(monitor.is_closed());
        assert!(matches!(
            monitor.set_interests(Interest::Write),
            Err(Error::ClosedMonitor)
        ));
    }
}
