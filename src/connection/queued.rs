use std::sync::Arc;

use bytes::Bytes;
use snafu::{OptionExt, Snafu};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use super::messages::PrinterMessage;
use super::{Channel, ChannelError, ClosedSnafu, PlayerId, Transport, TransportError};

/// A packet as it arrives from the transport, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    /// The player who sent the packet, if the transport knows one.
    pub sender: Option<PlayerId>,
    pub payload: Bytes,
}

/// A decoded message waiting to be handled on the simulation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: PlayerId,
    pub message: PrinterMessage,
}

/// A received packet could not be queued for the simulation thread.
#[derive(Debug, Snafu)]
pub enum EnqueueError {
    /// The packet did not come from a player.
    #[snafu(display("Packet has no sending player."))]
    NoSender,
    #[snafu(display("{source}"), context(false))]
    Malformed { source: ChannelError },
    /// The simulation thread has fallen too far behind.
    #[snafu(display("Work queue full, dropping {kind} from player {sender}."))]
    QueueFull {
        sender: PlayerId,
        kind: super::messages::MessageKind,
    },
    /// The simulation side of the queue has been dropped.
    #[snafu(display("Work queue closed."))]
    QueueClosed,
}

/// The simulation thread's end of the work queue.
///
/// Messages received by the transport task are pushed onto the queue by a
/// [`WorkSender`]; the simulation loop calls [`WorkQueue::drain`] once per
/// tick, before running game logic, so that block entities are only ever
/// touched from the simulation thread.
#[derive(Debug)]
pub struct WorkQueue {
    receiver: mpsc::Receiver<Envelope>,
    sender: mpsc::Sender<Envelope>,
    channel: Arc<Channel>,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` pending messages.
    pub fn new(channel: Arc<Channel>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            receiver,
            sender,
            channel,
        }
    }

    /// Returns a handle the transport side uses to enqueue packets.
    pub fn sender(&self) -> WorkSender {
        WorkSender {
            channel: self.channel.clone(),
            sender: self.sender.clone(),
        }
    }

    /// Hands every queued message to `handler` without waiting for more,
    /// returning how many were handled.
    pub fn drain(&mut self, mut handler: impl FnMut(Envelope)) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            handler(envelope);
            handled += 1;
        }
        handled
    }

    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a [`WorkQueue`] that decodes packets and enqueues them.
///
/// This struct can be cheaply cloned and sent to the transport's thread.
#[derive(Debug, Clone)]
pub struct WorkSender {
    channel: Arc<Channel>,
    sender: mpsc::Sender<Envelope>,
}

impl WorkSender {
    /// Decodes a packet and queues it for the simulation thread.
    ///
    /// Never blocks: if the queue is full the message is dropped.
    pub fn enqueue(&self, packet: InboundPacket) -> Result<(), EnqueueError> {
        let sender = packet.sender.context(NoSenderSnafu)?;
        let message = self.channel.decode(packet.payload)?;
        let kind = message.kind();
        match self.sender.try_send(Envelope { sender, message }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => QueueFullSnafu { sender, kind }.fail(),
            Err(TrySendError::Closed(_)) => QueueClosedSnafu.fail(),
        }
    }
}

/// Receives packets until the transport closes, queueing each one.
///
/// Packets that cannot be queued are logged and dropped; the client is never
/// told.
pub async fn worker(mut packets: mpsc::UnboundedReceiver<InboundPacket>, work: WorkSender) {
    while let Some(packet) = packets.recv().await {
        match work.enqueue(packet) {
            Ok(()) => {}
            Err(EnqueueError::QueueClosed) => {
                log::debug!("Work queue closed, stopping printer packet worker");
                return;
            }
            Err(err) => log::warn!("Dropping printer packet: {err}"),
        }
    }
    log::debug!("Printer transport closed");
}

/// Starts a background task that moves packets from the transport onto the
/// work queue.
pub fn spawn_worker(
    packets: mpsc::UnboundedReceiver<InboundPacket>,
    work: WorkSender,
) -> JoinHandle<()> {
    tokio::spawn(worker(packets, work))
}

/// An in-process transport from one player's client to the server.
///
/// Used when client and server share a process, and in tests.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    player: PlayerId,
    sender: mpsc::UnboundedSender<InboundPacket>,
}

impl LoopbackTransport {
    /// Creates a transport for `player` and the server end that receives
    /// its packets.
    pub fn new(player: PlayerId) -> (Self, mpsc::UnboundedReceiver<InboundPacket>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { player, sender }, receiver)
    }

    /// Creates another player's transport into the same server end.
    pub fn for_player(&self, player: PlayerId) -> Self {
        Self {
            player,
            sender: self.sender.clone(),
        }
    }
}

impl Transport for LoopbackTransport {
    fn send_to_server(&self, payload: Bytes) -> Result<(), TransportError> {
        self.sender
            .send(InboundPacket {
                sender: Some(self.player),
                payload,
            })
            .ok()
            .context(ClosedSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockPos, Rotation};
    use crate::connection::messages::RotationChange;
    use crate::connection::ClientConnection;

    fn rotation_packet(channel: &Channel, sender: Option<PlayerId>) -> InboundPacket {
        let message = PrinterMessage::from(RotationChange {
            block_entity: BlockPos::new(1, 2, 3),
            rotation: Rotation::Clockwise90,
        });
        InboundPacket {
            sender,
            payload: channel.encode(&message).unwrap(),
        }
    }

    #[test]
    fn drain_hands_over_messages_in_order() {
        let channel = Arc::new(Channel::printer());
        let mut queue = WorkQueue::new(channel.clone(), 8);
        let sender = queue.sender();
        sender
            .enqueue(rotation_packet(&channel, Some(PlayerId(1))))
            .unwrap();
        sender
            .enqueue(rotation_packet(&channel, Some(PlayerId(2))))
            .unwrap();
        assert_eq!(queue.len(), 2);

        let mut senders = Vec::new();
        assert_eq!(queue.drain(|envelope| senders.push(envelope.sender)), 2);
        assert_eq!(senders, [PlayerId(1), PlayerId(2)]);
        assert!(queue.is_empty());
        assert_eq!(queue.drain(|_| unreachable!()), 0);
    }

    #[test]
    fn packets_without_sender_are_rejected() {
        let channel = Arc::new(Channel::printer());
        let queue = WorkQueue::new(channel.clone(), 8);
        assert!(matches!(
            queue.sender().enqueue(rotation_packet(&channel, None)),
            Err(EnqueueError::NoSender)
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn malformed_packets_are_rejected() {
        let channel = Arc::new(Channel::printer());
        let queue = WorkQueue::new(channel, 8);
        let packet = InboundPacket {
            sender: Some(PlayerId(1)),
            payload: Bytes::from_static(&[0x03, 0x00]),
        };
        assert!(matches!(
            queue.sender().enqueue(packet),
            Err(EnqueueError::Malformed { .. })
        ));
    }

    #[test]
    fn full_queue_drops_messages() {
        let channel = Arc::new(Channel::printer());
        let mut queue = WorkQueue::new(channel.clone(), 1);
        let sender = queue.sender();
        sender
            .enqueue(rotation_packet(&channel, Some(PlayerId(1))))
            .unwrap();
        assert!(matches!(
            sender.enqueue(rotation_packet(&channel, Some(PlayerId(2)))),
            Err(EnqueueError::QueueFull { .. })
        ));
        assert_eq!(queue.drain(|_| {}), 1);
    }

    #[tokio::test]
    async fn worker_moves_packets_onto_the_queue() {
        let channel = Arc::new(Channel::printer());
        let mut queue = WorkQueue::new(channel.clone(), 8);
        let (transport, packets) = LoopbackTransport::new(PlayerId(7));
        let worker = spawn_worker(packets, queue.sender());

        let connection = ClientConnection::new(channel, transport);
        connection
            .send(RotationChange {
                block_entity: BlockPos::new(1, 2, 3),
                rotation: Rotation::Clockwise180,
            })
            .unwrap();
        drop(connection);
        worker.await.unwrap();

        let mut received = Vec::new();
        queue.drain(|envelope| received.push(envelope));
        assert_eq!(
            received,
            [Envelope {
                sender: PlayerId(7),
                message: RotationChange {
                    block_entity: BlockPos::new(1, 2, 3),
                    rotation: Rotation::Clockwise180,
                }
                .into(),
            }]
        );
    }

    #[test]
    fn loopback_reports_closed_transport() {
        let (transport, packets) = LoopbackTransport::new(PlayerId(1));
        drop(packets);
        assert!(transport.send_to_server(Bytes::new()).is_err());
    }
}
