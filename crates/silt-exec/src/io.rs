// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! I/O-shaped waitables: byte streams, channels, datagram ports.
//!
//! Channels and ports are pairs of cross-wired endpoints sharing their
//! buffers through `Rc<RefCell<..>>`, the single-threaded translation of
//! shared mailboxes. `loopback()` constructs both ends so that one side's
//! send appears on the other side's incoming buffer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::task::TaskId;
use crate::waitable::{Event, WaitResult, Waitable};

/// FIFO byte queue with an internal readiness event.
///
/// Readiness is level-triggered: pushing bytes signals the event, draining
/// the buffer to empty resets it so later waits park again.
#[derive(Debug, Default)]
pub struct ByteStream {
    data_ready: Event,
    buffer: VecDeque<u8>,
}

impl ByteStream {
    /// Creates an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Passes immediately when the buffer is nonempty; otherwise parks on
    /// the readiness event.
    pub fn wait_readable(&mut self, task: TaskId) -> WaitResult {
        if !self.buffer.is_empty() {
            return WaitResult::ready_now();
        }
        self.data_ready.wait(task)
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Drains up to `max_bytes` from the head of the buffer. Draining to
    /// empty resets the readiness event.
    pub fn recv(&mut self, max_bytes: usize) -> Vec<u8> {
        let count = max_bytes.min(self.buffer.len());
        let out: Vec<u8> = self.buffer.drain(..count).collect();
        if self.buffer.is_empty() {
            self.data_ready.reset();
        }
        out
    }

    /// Appends bytes and signals readiness, returning the tasks that were
    /// parked. An empty push is a no-op that still reports ready.
    pub fn push(&mut self, data: &[u8]) -> WaitResult {
        if data.is_empty() {
            return WaitResult::ready_now();
        }
        self.buffer.extend(data.iter().copied());
        self.data_ready.signal()
    }
}

impl Waitable for ByteStream {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        self.wait_readable(task)
    }
}

/// Bidirectional channel endpoint: a pair of byte streams wired in opposite
/// directions.
#[derive(Clone, Debug)]
pub struct Channel {
    incoming: Rc<RefCell<ByteStream>>,
    outgoing: Rc<RefCell<ByteStream>>,
}

impl Channel {
    /// Builds both ends of a loopback pair: `a.send` appears on `b`'s
    /// incoming stream and vice versa.
    #[must_use]
    pub fn loopback() -> (Channel, Channel) {
        let a_to_b = Rc::new(RefCell::new(ByteStream::new()));
        let b_to_a = Rc::new(RefCell::new(ByteStream::new()));
        let a = Channel {
            incoming: Rc::clone(&b_to_a),
            outgoing: Rc::clone(&a_to_b),
        };
        let b = Channel {
            incoming: a_to_b,
            outgoing: b_to_a,
        };
        (a, b)
    }

    /// Waits for the incoming stream to become readable.
    pub fn wait_readable(&self, task: TaskId) -> WaitResult {
        self.incoming.borrow_mut().wait_readable(task)
    }

    /// Bytes buffered on the incoming stream.
    #[must_use]
    pub fn available(&self) -> usize {
        self.incoming.borrow().available()
    }

    /// Drains up to `max_bytes` from the incoming stream.
    pub fn recv(&self, max_bytes: usize) -> Vec<u8> {
        self.incoming.borrow_mut().recv(max_bytes)
    }

    /// Pushes bytes onto the outgoing stream (the peer's incoming).
    pub fn send(&self, data: &[u8]) -> WaitResult {
        self.outgoing.borrow_mut().push(data)
    }
}

impl Waitable for Channel {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        self.wait_readable(task)
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    data_ready: Event,
    queue: VecDeque<Vec<u8>>,
}

/// Datagram endpoint: like a channel, but the transported unit is a whole
/// byte vector.
///
/// A port constructed without mailboxes ([`DatagramPort::disconnected`]) is
/// non-operational: waits and sends report not-ready, receives yield
/// nothing.
#[derive(Clone, Debug, Default)]
pub struct DatagramPort {
    inbox: Option<Rc<RefCell<Mailbox>>>,
    outbox: Option<Rc<RefCell<Mailbox>>>,
}

impl DatagramPort {
    /// A port wired to nothing.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Builds both ends of a loopback pair: `a.send` lands in `b`'s inbox
    /// and vice versa.
    #[must_use]
    pub fn loopback() -> (DatagramPort, DatagramPort) {
        let inbox_a = Rc::new(RefCell::new(Mailbox::default()));
        let inbox_b = Rc::new(RefCell::new(Mailbox::default()));
        let a = DatagramPort {
            inbox: Some(Rc::clone(&inbox_a)),
            outbox: Some(Rc::clone(&inbox_b)),
        };
        let b = DatagramPort {
            inbox: Some(inbox_b),
            outbox: Some(inbox_a),
        };
        (a, b)
    }

    /// Passes immediately when a datagram is queued; otherwise parks on the
    /// inbox readiness event. Disconnected ports report not-ready without
    /// parking.
    pub fn wait_readable(&self, task: TaskId) -> WaitResult {
        let (Some(inbox), Some(_)) = (&self.inbox, &self.outbox) else {
            return WaitResult::parked();
        };
        let mut inbox = inbox.borrow_mut();
        if !inbox.queue.is_empty() {
            return WaitResult::ready_now();
        }
        inbox.data_ready.wait(task)
    }

    /// Dequeues one whole datagram, or `None` when the inbox is empty.
    /// Draining the last datagram resets inbox readiness.
    pub fn recv(&self) -> Option<Vec<u8>> {
        let inbox = self.inbox.as_ref()?;
        let mut inbox = inbox.borrow_mut();
        let packet = inbox.queue.pop_front()?;
        if inbox.queue.is_empty() {
            inbox.data_ready.reset();
        }
        Some(packet)
    }

    /// Enqueues a whole datagram into the peer's inbox and signals its
    /// readiness. Disconnected ports report not-ready.
    pub fn send(&self, data: &[u8]) -> WaitResult {
        let (Some(_), Some(outbox)) = (&self.inbox, &self.outbox) else {
            return WaitResult::parked();
        };
        let mut outbox = outbox.borrow_mut();
        outbox.queue.push_back(data.to_vec());
        outbox.data_ready.signal()
    }
}

impl Waitable for DatagramPort {
    fn wait(&mut self, task: TaskId) -> WaitResult {
        self.wait_readable(task)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stream_buffers_and_resets_readiness() {
        let mut stream = ByteStream::new();
        assert!(stream.push(&[0x10]).ready);
        assert_eq!(stream.available(), 1);
        assert_eq!(stream.recv(1), vec![0x10]);
        // Drained to empty: the next wait parks again.
        assert!(!stream.wait_readable(7).ready);
    }

    #[test]
    fn stream_recv_respects_the_cap() {
        let mut stream = ByteStream::new();
        stream.push(&[1, 2, 3, 4]);
        assert_eq!(stream.recv(2), vec![1, 2]);
        assert_eq!(stream.available(), 2);
        // Still nonempty: waits pass without parking.
        assert!(stream.wait_readable(7).ready);
        assert_eq!(stream.recv(10), vec![3, 4]);
        assert_eq!(stream.recv(1), Vec::<u8>::new());
    }

    #[test]
    fn empty_push_is_a_ready_noop() {
        let mut stream = ByteStream::new();
        let result = stream.push(&[]);
        assert!(result.ready);
        assert!(result.woken.is_empty());
        assert_eq!(stream.available(), 0);
    }

    #[test]
    fn stream_push_wakes_parked_readers() {
        let mut stream = ByteStream::new();
        assert!(!stream.wait_readable(1).ready);
        let pushed = stream.push(&[9]);
        assert!(pushed.ready);
        assert_eq!(pushed.woken, vec![1]);
    }

    #[test]
    fn channel_loopback_crosses_sides() {
        let (a, b) = Channel::loopback();
        assert!(a.send(&[0x10, 0x20, 0x30, 0x40]).ready);
        assert!(b.wait_readable(2).ready);
        assert_eq!(b.recv(10), vec![0x10, 0x20, 0x30, 0x40]);
        assert_eq!(b.available(), 0);

        // And the reverse direction.
        b.send(&[0x7f]);
        assert_eq!(a.recv(10), vec![0x7f]);
    }

    #[test]
    fn channel_send_wakes_the_peer_side_waiter() {
        let (a, b) = Channel::loopback();
        assert!(!b.wait_readable(1).ready);
        let sent = a.send(&[1, 2, 3]);
        assert!(sent.ready);
        assert_eq!(sent.woken, vec![1]);
    }

    #[test]
    fn datagrams_travel_whole() {
        let (a, b) = DatagramPort::loopback();
        a.send(&[1, 2]);
        a.send(&[3]);
        assert!(b.wait_readable(5).ready);
        assert_eq!(b.recv(), Some(vec![1, 2]));
        assert_eq!(b.recv(), Some(vec![3]));
        assert_eq!(b.recv(), None);
        // Inbox drained: the next wait parks.
        assert!(!b.wait_readable(5).ready);
    }

    #[test]
    fn disconnected_port_is_inert() {
        let port = DatagramPort::disconnected();
        let waited = port.wait_readable(1);
        assert!(!waited.ready);
        assert!(waited.woken.is_empty());
        assert!(!port.send(&[1]).ready);
        assert_eq!(port.recv(), None);
    }
}
