//! Drive commands and the outbound command seam.
//!
//! Drive commands are fire-and-forget: there is no acknowledgement and no
//! retry. [`ChannelCommandSink`] uses a bounded channel and drops drive
//! commands when it is full, which mirrors a lossy radio link. A stop is
//! never dropped: it waits for room in the channel, up to a timeout.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};

use crate::error::{NavError, Result};

/// A drive command for the rover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriveCommand {
    /// Throttle in [-1, 1]
    pub throttle: f64,
    /// Steering angle in degrees (positive turns towards +X)
    pub turn: f64,
    /// Auxiliary channel
    pub aux: f64,
}

impl DriveCommand {
    /// Full stop.
    pub const STOP: DriveCommand = DriveCommand {
        throttle: 0.0,
        turn: 0.0,
        aux: 0.0,
    };

    /// Create a command, clamping throttle to [-1, 1].
    pub fn new(throttle: f64, turn: f64, aux: f64) -> Self {
        Self {
            throttle: throttle.clamp(-1.0, 1.0),
            turn,
            aux,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.throttle == 0.0 && self.turn == 0.0 && self.aux == 0.0
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_stop() {
            return write!(f, "DRIVE 0 0 0");
        }
        write!(f, "DRIVE {} {:.2} {}", self.throttle, self.turn, self.aux)
    }
}

/// Outbound drive command channel.
pub trait CommandSink: Send + Sync {
    /// Hand a command to the transport. No delivery guarantee.
    fn send_drive(&self, command: DriveCommand) -> Result<()>;

    /// Send a full stop. Implementations must not drop it silently.
    fn send_stop(&self) -> Result<()> {
        self.send_drive(DriveCommand::STOP)
    }
}

/// How long a stop waits for room in a full channel.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Command sink backed by a bounded crossbeam channel.
#[derive(Clone, Debug)]
pub struct ChannelCommandSink {
    tx: Sender<DriveCommand>,
    stop_timeout: Duration,
}

impl ChannelCommandSink {
    /// Create a sink and the receiver a transport drains.
    pub fn new(capacity: usize) -> (Self, Receiver<DriveCommand>) {
        Self::with_stop_timeout(capacity, DEFAULT_STOP_TIMEOUT)
    }

    pub fn with_stop_timeout(
        capacity: usize,
        stop_timeout: Duration,
    ) -> (Self, Receiver<DriveCommand>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx, stop_timeout }, rx)
    }
}

impl CommandSink for ChannelCommandSink {
    fn send_drive(&self, command: DriveCommand) -> Result<()> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                tracing::trace!("Command channel full, dropped {}", dropped);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(NavError::CommandDelivery(
                "command channel disconnected".to_string(),
            )),
        }
    }

    fn send_stop(&self) -> Result<()> {
        match self.tx.send_timeout(DriveCommand::STOP, self.stop_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(NavError::CommandDelivery(format!(
                "stop not accepted within {:?}",
                self.stop_timeout
            ))),
            Err(SendTimeoutError::Disconnected(_)) => Err(NavError::CommandDelivery(
                "command channel disconnected".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_link_format() {
        assert_eq!(DriveCommand::new(0.4, 5.0, 1.0).to_string(), "DRIVE 0.4 5.00 1");
        assert_eq!(DriveCommand::new(0.4, -12.345, 1.0).to_string(), "DRIVE 0.4 -12.35 1");
        assert_eq!(DriveCommand::STOP.to_string(), "DRIVE 0 0 0");
    }

    #[test]
    fn test_throttle_clamped() {
        assert_eq!(DriveCommand::new(3.0, 0.0, 0.0).throttle, 1.0);
        assert_eq!(DriveCommand::new(-3.0, 0.0, 0.0).throttle, -1.0);
    }

    #[test]
    fn test_full_channel_drops_silently() {
        let (sink, rx) = ChannelCommandSink::new(1);
        sink.send_drive(DriveCommand::new(0.4, 1.0, 1.0)).unwrap();
        sink.send_drive(DriveCommand::new(0.4, 2.0, 1.0)).unwrap();
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.try_recv().unwrap().turn, 1.0);
    }

    #[test]
    fn test_stop_waits_for_room() {
        let (sink, rx) = ChannelCommandSink::new(1);
        sink.send_drive(DriveCommand::new(0.4, 0.0, 1.0)).unwrap();

        let drain = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            rx.iter().collect::<Vec<_>>()
        });
        sink.send_stop().unwrap();
        drop(sink);

        let received = drain.join().unwrap();
        assert_eq!(received.len(), 2);
        assert!(received[1].is_stop());
    }

    #[test]
    fn test_stop_times_out_when_never_drained() {
        let (sink, _rx) = ChannelCommandSink::with_stop_timeout(1, Duration::from_millis(10));
        sink.send_drive(DriveCommand::new(0.4, 0.0, 1.0)).unwrap();
        assert!(matches!(
            sink.send_stop(),
            Err(NavError::CommandDelivery(_))
        ));
    }

    #[test]
    fn test_disconnected_channel_is_an_error() {
        let (sink, rx) = ChannelCommandSink::new(4);
        drop(rx);
        assert!(matches!(
            sink.send_stop(),
            Err(NavError::CommandDelivery(_))
        ));
    }
}
