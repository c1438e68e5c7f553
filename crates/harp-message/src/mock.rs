use crate::{HarpError, HarpLink, HarpMessage, LinkInfo, MessageType, PayloadType, Result};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tracing::debug;

/// An in-process register file that answers like a Harp device.
///
/// Writes are stored and echoed back as timestamped `Write` replies. Reads
/// are answered with the stored payload, or with an error reply when the
/// address was never written. Replies queue up until `recv` drains them.
pub struct MockDevice {
    name: String,
    opened: Instant,
    registers: HashMap<u16, (PayloadType, Vec<u8>)>,
    replies: VecDeque<HarpMessage>,
}

impl MockDevice {
    fn now(&self) -> f64 {
        self.opened.elapsed().as_secs_f64()
    }

    /// Current contents of a register, if it was ever written
    pub fn register(&self, address: u16) -> Option<(PayloadType, &[u8])> {
        self.registers
            .get(&address)
            .map(|(ty, data)| (*ty, data.as_slice()))
    }

    /// Number of replies waiting to be received
    pub fn pending(&self) -> usize {
        self.replies.len()
    }

    /// Queue a device-originated event, as if the firmware raised it.
    pub fn inject_event(&mut self, address: u16, payload_type: PayloadType, payload: Vec<u8>) {
        let ts = self.now();
        self.replies.push_back(HarpMessage::timestamped(
            ts,
            MessageType::Event,
            address,
            payload_type,
            payload,
        ));
    }
}

impl HarpLink for MockDevice {
    fn open(name: &str) -> Result<Self> {
        if !Self::list()?.iter().any(|link| link.name == name) {
            return Err(HarpError::InterfaceNotFound(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            opened: Instant::now(),
            registers: HashMap::new(),
            replies: VecDeque::new(),
        })
    }

    fn list() -> Result<Vec<LinkInfo>> {
        Ok(vec![LinkInfo {
            name: "mock0".to_string(),
            driver: "mock".to_string(),
        }])
    }

    fn recv(&mut self, _timeout_ms: Option<u64>) -> Result<HarpMessage> {
        // Nothing arrives asynchronously, so waiting would never help
        self.replies.pop_front().ok_or(HarpError::Timeout)
    }

    fn send(&mut self, message: &HarpMessage) -> Result<()> {
        let width = message.payload_type.width();
        if width == 0 || message.payload.len() % width != 0 {
            return Err(HarpError::InvalidMessage("payload is not whole elements"));
        }
        let ts = self.now();
        let reply = match message.message_type {
            MessageType::Write => {
                self.registers.insert(
                    message.address,
                    (message.payload_type, message.payload.clone()),
                );
                HarpMessage::timestamped(
                    ts,
                    MessageType::Write,
                    message.address,
                    message.payload_type,
                    message.payload.clone(),
                )
            }
            MessageType::Read => match self.registers.get(&message.address) {
                Some((ty, data)) => {
                    HarpMessage::timestamped(ts, MessageType::Read, message.address, *ty, data.clone())
                }
                None => HarpMessage::timestamped(
                    ts,
                    MessageType::Read,
                    message.address,
                    message.payload_type,
                    Vec::new(),
                )
                .with_error(true),
            },
            MessageType::Event => {
                return Err(HarpError::InvalidMessage("events originate on the device"));
            }
        };
        debug!(link = %self.name, address = message.address, "mock reply queued");
        self.replies.push_back(reply.with_port(message.port));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_back() {
        let mut dev = MockDevice::open("mock0").unwrap();
        let write = HarpMessage::new(MessageType::Write, 35, PayloadType::U16, vec![0x09, 0x00]);
        dev.send(&write).unwrap();
        let echo = dev.recv(Some(10)).unwrap();
        assert_eq!(echo.message_type, MessageType::Write);
        assert_eq!(echo.payload, vec![0x09, 0x00]);
        assert!(echo.timestamp.is_some());

        dev.send(&HarpMessage::new(MessageType::Read, 35, PayloadType::U16, vec![]))
            .unwrap();
        let reply = dev.recv(None).unwrap();
        assert_eq!(reply.message_type, MessageType::Read);
        assert!(!reply.is_error);
        assert_eq!(reply.payload, vec![0x09, 0x00]);
    }

    #[test]
    fn read_unwritten_register_is_error_reply() {
        let mut dev = MockDevice::open("mock0").unwrap();
        dev.send(&HarpMessage::new(MessageType::Read, 90, PayloadType::U16, vec![]))
            .unwrap();
        let reply = dev.recv(None).unwrap();
        assert!(reply.is_error);
        assert!(reply.payload.is_empty());
    }

    #[test]
    fn open_accepts_only_listed_links() {
        for link in MockDevice::list().unwrap() {
            assert!(MockDevice::open(&link.name).is_ok());
        }
        match MockDevice::open("bogus") {
            Err(HarpError::InterfaceNotFound(name)) => assert_eq!(name, "bogus"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("opened an unlisted link"),
        }
    }

    #[test]
    fn empty_queue_times_out() {
        let mut dev = MockDevice::open("mock0").unwrap();
        assert!(matches!(dev.recv(Some(1)), Err(HarpError::Timeout)));
    }

    #[test]
    fn rejects_partial_elements_and_host_events() {
        let mut dev = MockDevice::open("mock0").unwrap();
        let partial = HarpMessage::new(MessageType::Write, 42, PayloadType::Float, vec![0, 0, 0]);
        assert!(matches!(
            dev.send(&partial),
            Err(HarpError::InvalidMessage(_))
        ));
        let event = HarpMessage::new(MessageType::Event, 32, PayloadType::U8, vec![1]);
        assert!(matches!(dev.send(&event), Err(HarpError::InvalidMessage(_))));
        assert_eq!(dev.pending(), 0);
    }

    #[test]
    fn injected_events_are_received_in_order() {
        let mut dev = MockDevice::open("mock0").unwrap();
        dev.inject_event(32, PayloadType::U8, vec![0x01]);
        dev.inject_event(32, PayloadType::U8, vec![0x00]);
        let a = dev.recv(None).unwrap();
        let b = dev.recv(None).unwrap();
        assert_eq!(a.payload, vec![0x01]);
        assert_eq!(b.payload, vec![0x00]);
        assert!(a.timestamp <= b.timestamp);
    }
}
