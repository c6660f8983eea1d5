//! Byte transport underneath ATT
//!
//! The link layer (L2CAP fixed channel, socket, test pipe) is reached through
//! [`Transport`]. Inbound PDUs travel the other way: whoever owns the link calls
//! `handle_pdu` on the [`ClientConnection`](super::ClientConnection) or
//! [`AttClient`](super::AttClient) for every complete PDU it receives.

use super::constants::ATT_DEFAULT_MTU;
use super::error::{AttError, AttResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Outbound half of an ATT bearer
pub trait Transport: Send + Sync {
    /// Send one complete PDU
    fn write(&self, pdu: &[u8]) -> AttResult<()>;

    /// MTU currently in effect on this link
    fn mtu(&self) -> u16;

    /// Record a newly negotiated MTU
    fn set_mtu(&self, mtu: u16);
}

/// Transport that hands every PDU to an mpsc channel, for links driven by a
/// separate writer thread.
pub struct ChannelTransport {
    sender: Mutex<Sender<Vec<u8>>>,
    mtu: AtomicU16,
}

impl ChannelTransport {
    /// Create a transport and the receiver its PDUs come out of
    pub fn new() -> (Self, Receiver<Vec<u8>>) {
        let (sender, receiver) = mpsc::channel();
        let transport = Self {
            sender: Mutex::new(sender),
            mtu: AtomicU16::new(ATT_DEFAULT_MTU),
        };
        (transport, receiver)
    }
}

impl Transport for ChannelTransport {
    fn write(&self, pdu: &[u8]) -> AttResult<()> {
        self.sender
            .lock()
            .send(pdu.to_vec())
            .map_err(|_| AttError::ConnectionClosed)
    }

    fn mtu(&self) -> u16 {
        self.mtu.load(Ordering::Acquire)
    }

    fn set_mtu(&self, mtu: u16) {
        self.mtu.store(mtu, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_transport() {
        let (transport, rx) = ChannelTransport::new();
        assert_eq!(transport.mtu(), ATT_DEFAULT_MTU);

        transport.write(&[0x13]).unwrap();
        assert_eq!(rx.recv().unwrap(), vec![0x13]);

        transport.set_mtu(64);
        assert_eq!(transport.mtu(), 64);

        drop(rx);
        assert!(matches!(transport.write(&[0x13]), Err(AttError::ConnectionClosed)));
    }
}
