//! Unbuffered, single-slot rendezvous channels.
//!
//! A rendezvous channel has no buffer: a `send` only completes once a
//! matching `receive` is ready to take the value (or vice versa), and at
//! any moment at most one sender and one receiver may be parked on it.
//!
//! ```text
//!                    +--------------------+
//!   Sender  -------->|        Core        |<-------- Receiver
//!   send(v)          |  tag: AtomicU8     |          receive()
//!                    |  EMPTY             |
//!                    |  SENDER_REGISTERED |
//!                    |  SENDER_WAITING    |
//!                    |  RECEIVER_WAITING  |
//!                    +--------------------+
//! ```
//!
//! The state machine lives in [`core::Core`]; [`Sender`] and [`Receiver`]
//! are thin, cloneable handles around a shared `Arc<Core<T>>`.
//!
//! | from \ on | `register_sender` | `send(v)` | `receive` |
//! |---|---|---|---|
//! | `Empty` | park sender → `SenderRegistered` | park sender+value → `SenderWaiting` | park receiver → `ReceiverWaiting` |
//! | `SenderRegistered` | reject: `AlreadySending` | park value → `SenderWaiting` | wake sender with `Ok(())`, park receiver → `ReceiverWaiting` |
//! | `SenderWaiting` | reject: `AlreadySending` | reject: `AlreadySending` | rendezvous: hand value to receiver, `Ok(())` to sender → `Empty` |
//! | `ReceiverWaiting` | wake sender immediately with `Ok(())` (no transition) | rendezvous: hand value to receiver, `Ok(())` to sender → `Empty` | reject: `AlreadyReceiving` |

mod core;
mod receiver;
mod sender;

pub use receiver::Receiver;
pub use sender::Sender;

use std::sync::Arc;

use crate::runner::Runner;

/// Create a new rendezvous channel, with completion callbacks dispatched by
/// `runner`.
///
/// Use [`Runner::Synchronous`] for deterministic single-threaded use, or
/// [`Runner::thread_pool`] when senders and receivers run on different
/// threads and must not run each other's callbacks inline.
pub fn channel<T: Send + 'static>(runner: Runner) -> (Sender<T>, Receiver<T>) {
    let core = Arc::new(core::Core::new(runner));
    (Sender::new(Arc::clone(&core)), Receiver::new(core))
}

pub(crate) use core::Core;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn receiver_parked_first_then_sender_rendezvous() {
        let (tx, rx) = channel::<u32>(Runner::Synchronous);
        let rx_thread = thread::spawn(move || rx.recv_blocking());
        thread::sleep(Duration::from_millis(20));
        tx.send_blocking(7).unwrap();
        assert_eq!(rx_thread.join().unwrap().unwrap(), 7);
    }

    #[test]
    fn sender_parked_first_then_receiver_rendezvous() {
        let (tx, rx) = channel::<u32>(Runner::Synchronous);
        let tx_thread = thread::spawn(move || tx.send_blocking(9));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(rx.recv_blocking().unwrap(), 9);
        tx_thread.join().unwrap().unwrap();
    }

    #[test]
    fn second_sender_is_rejected() {
        let (tx, rx) = channel::<u32>(Runner::thread_pool(2));
        let tx2 = tx.clone();
        let first = thread::spawn(move || tx.send_blocking(1));
        thread::sleep(Duration::from_millis(20));
        let second = tx2.send_blocking(2);
        assert!(matches!(second, Err(ChannelError::AlreadySending)));
        rx.recv_blocking().unwrap();
        first.join().unwrap().unwrap();
    }

    #[test]
    fn second_receiver_is_rejected() {
        let (tx, rx) = channel::<u32>(Runner::thread_pool(2));
        let rx2 = rx.clone();
        let first = thread::spawn(move || rx.recv_blocking());
        thread::sleep(Duration::from_millis(20));
        let second = rx2.recv_blocking();
        assert!(matches!(second, Err(ChannelError::AlreadyReceiving)));
        tx.send_blocking(5).unwrap();
        assert_eq!(first.join().unwrap().unwrap(), 5);
    }

    #[test]
    fn dropping_receiver_disconnects_sender() {
        let (tx, rx) = channel::<u32>(Runner::Synchronous);
        drop(rx);
        assert!(tx.is_closed());
    }

    #[cfg(feature = "async")]
    #[test]
    fn async_send_receive_rendezvous() {
        let (tx, rx) = channel::<u32>(Runner::Synchronous);
        let (sent, received) = crate::task::run_async(async {
            let recv = rx.receive();
            let send = tx.send(11);
            futures::join!(send, recv)
        });
        sent.unwrap();
        assert_eq!(received.unwrap(), 11);
    }

    /// Same rendezvous, driven by a real multi-threaded executor instead of
    /// the crate's own single-future `run_async`, with sender and receiver
    /// each on their own spawned task.
    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_send_receive_on_separate_tokio_tasks() {
        let (tx, rx) = channel::<i32>(Runner::thread_pool(2));

        let sender = tokio::spawn(async move {
            for i in 0..10 {
                tx.send(i).await.unwrap();
            }
        });

        for i in 0..10 {
            assert_eq!(rx.receive().await.unwrap(), i);
        }

        sender.await.unwrap();
    }
}
