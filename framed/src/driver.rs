//! The tokio driver of the client engine.

use std::{
    io,
    net::SocketAddr,
    sync::Arc,
    task::Poll,
    time::Duration,
};

use futures::{
    channel::{mpsc, oneshot},
    future, StreamExt,
};
use tokio::{
    io::ReadBuf,
    net::UdpSocket,
    time::{self, Instant, MissedTickBehavior},
};

use dhcp_client::{Client, Error, InterfaceId, Lease, LeaseObserver, Record, Result, State};

use crate::socket::{UdpTransport, BUFFER_READ_CAPACITY};

/// A request to the driver task.
enum Command {
    Start(InterfaceId, oneshot::Sender<Result<()>>),
    Renew(InterfaceId, oneshot::Sender<Result<()>>),
    Release(InterfaceId, oneshot::Sender<Result<()>>),
    Stop(InterfaceId, oneshot::Sender<()>),
    Inform(InterfaceId, oneshot::Sender<Result<()>>),
    NetworkChanged(InterfaceId),
    SetRecord(InterfaceId, Record, oneshot::Sender<Result<()>>),
    SetObserver(InterfaceId, Option<Box<dyn LeaseObserver>>, oneshot::Sender<Result<()>>),
    State(InterfaceId, oneshot::Sender<Option<State>>),
    Lease(InterfaceId, oneshot::Sender<Option<Lease>>),
}

/// Owns the client and runs its timers and its socket.
///
/// ```no_run
/// # async fn run(client: dhcp_client::Client<dhcp_framed::UdpTransport>, id: dhcp_client::InterfaceId) {
/// let (driver, handle) = dhcp_framed::Driver::new(client);
/// tokio::spawn(driver.run());
/// handle.start(id).await.unwrap();
/// # }
/// ```
pub struct Driver {
    client: Client<UdpTransport>,
    commands: mpsc::UnboundedReceiver<Command>,
}

/// Controls a running `Driver`. The driver stops when every handle is dropped.
#[derive(Clone)]
pub struct Handle {
    commands: mpsc::UnboundedSender<Command>,
}

impl Driver {
    /// Takes over the client. Interfaces must be added before, records and
    /// observers may be set either before or through the `Handle`.
    pub fn new(client: Client<UdpTransport>) -> (Self, Handle) {
        let (sender, receiver) = mpsc::unbounded();
        let driver = Driver {
            client,
            commands: receiver,
        };
        (driver, Handle { commands: sender })
    }

    /// Runs until all handles are gone and returns the client.
    pub async fn run(mut self) -> Client<UdpTransport> {
        let fine_period = Duration::from_millis(u64::from(self.client.config().fine_timer_msecs.max(1)));
        let coarse_period = Duration::from_secs(u64::from(self.client.config().coarse_timer_secs.max(1)));
        let mut fine = time::interval_at(Instant::now() + fine_period, fine_period);
        let mut coarse = time::interval_at(Instant::now() + coarse_period, coarse_period);
        fine.set_missed_tick_behavior(MissedTickBehavior::Delay);
        coarse.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buffer = vec![0u8; BUFFER_READ_CAPACITY];
        loop {
            let sockets = self.client.transport().sockets();
            tokio::select! {
                _ = fine.tick() => self.client.fine_tick(),
                _ = coarse.tick() => self.client.coarse_tick(),
                command = self.commands.next() => match command {
                    Some(command) => self.execute(command),
                    None => break,
                },
                received = receive(sockets, &mut buffer) => match received {
                    Ok((amount, source)) => {
                        trace!("Received {} bytes from {}", amount, source);
                        self.client.dispatch(&buffer[..amount]);
                    }
                    Err(error) => warn!("Socket error: {}", error),
                },
            }
        }

        info!("DHCP driver stopped");
        self.client
    }

    fn execute(&mut self, command: Command) {
        // a dropped receiver means the caller is no longer interested
        match command {
            Command::Start(id, reply) => {
                let _ = reply.send(self.client.start(id));
            }
            Command::Renew(id, reply) => {
                let _ = reply.send(self.client.renew(id));
            }
            Command::Release(id, reply) => {
                let _ = reply.send(self.client.release(id));
            }
            Command::Stop(id, reply) => {
                self.client.stop(id);
                let _ = reply.send(());
            }
            Command::Inform(id, reply) => {
                let _ = reply.send(self.client.inform(id));
            }
            Command::NetworkChanged(id) => self.client.network_changed(id),
            Command::SetRecord(id, record, reply) => {
                let _ = reply.send(self.client.set_record(id, record));
            }
            Command::SetObserver(id, observer, reply) => {
                let _ = reply.send(self.client.set_observer(id, observer));
            }
            Command::State(id, reply) => {
                let _ = reply.send(self.client.state(id));
            }
            Command::Lease(id, reply) => {
                let _ = reply.send(self.client.record(id).and_then(|record| record.lease()));
            }
        }
    }
}

impl Handle {
    pub async fn start(&self, id: InterfaceId) -> Result<()> {
        self.request(|reply| Command::Start(id, reply))
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    pub async fn renew(&self, id: InterfaceId) -> Result<()> {
        self.request(|reply| Command::Renew(id, reply))
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    pub async fn release(&self, id: InterfaceId) -> Result<()> {
        self.request(|reply| Command::Release(id, reply))
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    pub async fn stop(&self, id: InterfaceId) {
        self.request(|reply| Command::Stop(id, reply)).await;
    }

    pub async fn inform(&self, id: InterfaceId) -> Result<()> {
        self.request(|reply| Command::Inform(id, reply))
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    /// Reports that the link of the interface came back up.
    pub fn network_changed(&self, id: InterfaceId) {
        if self.commands.unbounded_send(Command::NetworkChanged(id)).is_err() {
            warn!("The DHCP driver has stopped");
        }
    }

    /// Supplies the record of an interface, see `Client::set_record`.
    pub async fn set_record(&self, id: InterfaceId, record: Record) -> Result<()> {
        self.request(|reply| Command::SetRecord(id, record, reply))
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    /// Sets the lease observer of an interface record, see `Client::set_observer`.
    pub async fn set_observer(&self, id: InterfaceId, observer: Option<Box<dyn LeaseObserver>>) -> Result<()> {
        self.request(|reply| Command::SetObserver(id, observer, reply))
            .await
            .unwrap_or_else(|| Err(stopped()))
    }

    /// `None` if the driver has stopped or the interface has no record.
    pub async fn state(&self, id: InterfaceId) -> Option<State> {
        self.request(|reply| Command::State(id, reply)).await.flatten()
    }

    pub async fn lease(&self, id: InterfaceId) -> Option<Lease> {
        self.request(|reply| Command::Lease(id, reply)).await.flatten()
    }

    async fn request<R, F>(&self, command: F) -> Option<R>
    where
        F: FnOnce(oneshot::Sender<R>) -> Command,
    {
        let (sender, receiver) = oneshot::channel();
        self.commands.unbounded_send(command(sender)).ok()?;
        receiver.await.ok()
    }
}

/// The next datagram from any of the interface sockets.
async fn receive(sockets: Vec<Arc<UdpSocket>>, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
    if sockets.is_empty() {
        return future::pending().await;
    }
    future::poll_fn(|context| {
        for socket in sockets.iter() {
            let mut read = ReadBuf::new(&mut buffer[..]);
            if let Poll::Ready(result) = socket.poll_recv_from(context, &mut read) {
                return Poll::Ready(result.map(|source| (read.filled().len(), source)));
            }
        }
        Poll::Pending
    })
    .await
}

fn stopped() -> Error {
    Error::Endpoint(io::Error::new(io::ErrorKind::BrokenPipe, "The DHCP driver has stopped"))
}
