//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use ip_failover_watch::alert::{AlertError, AlertMessage, Mailer};
use ip_failover_watch::config::{parse_config, FailoverConfig};
use ip_failover_watch::failover::{Collaborators, FailoverController, Verifier, VerifyError};
use ip_failover_watch::health::{Measurement, Measurer, ProbeError};
use ip_failover_watch::node::{ServerId, ServerNode};
use ip_failover_watch::remote::{AliasState, RemoteError, RemoteExecutor};

pub const FAILOVER_IP: &str = "10.0.0.100";

pub fn test_config() -> FailoverConfig {
    parse_config(
        r#"
failover_ip = "10.0.0.100"
alert_email = "ops@example.com"
check_timeout = 2

[network_health_check]
check_ip = "10.0.0.254"
warn_at_time = 8
warn_at_loss = 10
switch_with_timediff = 20
switch_with_lossdiff = 15

[ssh_opts]
port = 22
user = "root"
keyfile = "/root/.ssh/id_failover"

[server_a]
ip = "10.0.0.1"
failover_eth = "eth0:2"
check_url = "http://10.0.0.1:9200/"

[server_b]
ip = "10.0.0.2"
failover_eth = "eth0:2"
check_url = "http://10.0.0.2:9200/"

[controller]
verify_attempts = 2
verify_backoff_ms = 1
"#,
    )
    .unwrap()
}

/// Scripted measurements per server. `None` means the server is unreachable.
#[derive(Default)]
pub struct FakeMeasurer {
    results: Mutex<HashMap<ServerId, Option<Measurement>>>,
}

impl FakeMeasurer {
    pub fn set(&self, id: ServerId, avg_time_ms: f64, loss_pct: f64) {
        self.results
            .lock()
            .unwrap()
            .insert(id, Some(Measurement { avg_time_ms, loss_pct }));
    }

    pub fn unreachable(&self, id: ServerId) {
        self.results.lock().unwrap().insert(id, None);
    }
}

#[async_trait]
impl Measurer for FakeMeasurer {
    async fn measure(
        &self,
        from: &ServerNode,
        _target: IpAddr,
        _timeout: Duration,
    ) -> Result<Measurement, ProbeError> {
        let result = self.results.lock().unwrap().get(&from.id).copied().flatten();
        result.ok_or_else(|| {
            ProbeError::Unreachable(RemoteError::Connection("ssh: connect to host: No route to host".into()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    BringUp(ServerId),
    BringDown(ServerId),
    Query(ServerId),
}

/// Records every interface operation and tracks alias state like a real host would.
#[derive(Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<Call>>,
    aliases: Mutex<HashMap<ServerId, AliasState>>,
    fail_bring_up: Mutex<HashSet<ServerId>>,
    fail_bring_down: Mutex<HashSet<ServerId>>,
    fail_query: Mutex<HashSet<ServerId>>,
    hang_bring_up: Mutex<HashSet<ServerId>>,
    bring_down_delay: Mutex<Option<Duration>>,
}

impl FakeExecutor {
    pub fn holding(id: ServerId) -> Self {
        let executor = Self::default();
        executor.set_alias(id, AliasState::Present);
        executor.set_alias(id.other(), AliasState::Absent);
        executor
    }

    pub fn set_alias(&self, id: ServerId, state: AliasState) {
        self.aliases.lock().unwrap().insert(id, state);
    }

    pub fn alias(&self, id: ServerId) -> AliasState {
        self.aliases
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(AliasState::Absent)
    }

    pub fn fail_bring_up(&self, id: ServerId) {
        self.fail_bring_up.lock().unwrap().insert(id);
    }

    pub fn fail_bring_down(&self, id: ServerId) {
        self.fail_bring_down.lock().unwrap().insert(id);
    }

    /// `bring_up` on `id` never returns.
    pub fn hang_bring_up(&self, id: ServerId) {
        self.hang_bring_up.lock().unwrap().insert(id);
    }

    /// Every `bring_down` takes `delay` before the alias is released.
    pub fn slow_bring_down(&self, delay: Duration) {
        *self.bring_down_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_query(&self, id: ServerId) {
        self.fail_query.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than state queries.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Query(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteExecutor for FakeExecutor {
    async fn bring_up(&self, server: &ServerNode, _ip: IpAddr) -> Result<(), RemoteError> {
        self.record(Call::BringUp(server.id));
        let hang = self.hang_bring_up.lock().unwrap().contains(&server.id);
        if hang {
            std::future::pending::<()>().await;
        }
        if self.fail_bring_up.lock().unwrap().contains(&server.id) {
            return Err(RemoteError::CommandFailed {
                code: Some(2),
                stderr: "RTNETLINK answers: Cannot assign requested address".into(),
            });
        }
        self.set_alias(server.id, AliasState::Present);
        Ok(())
    }

    async fn bring_down(&self, server: &ServerNode, _ip: IpAddr) -> Result<(), RemoteError> {
        self.record(Call::BringDown(server.id));
        let delay = *self.bring_down_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_bring_down.lock().unwrap().contains(&server.id) {
            return Err(RemoteError::Connection("Connection refused".into()));
        }
        self.set_alias(server.id, AliasState::Absent);
        Ok(())
    }

    async fn query_state(&self, server: &ServerNode, _ip: IpAddr) -> Result<AliasState, RemoteError> {
        self.record(Call::Query(server.id));
        if self.fail_query.lock().unwrap().contains(&server.id) {
            return Err(RemoteError::Connection("Connection timed out".into()));
        }
        Ok(self.alias(server.id))
    }
}

/// Replays scripted verification results; succeeds once the script runs out.
#[derive(Default)]
pub struct FakeVerifier {
    script: Mutex<VecDeque<Result<(), VerifyError>>>,
    attempts: Mutex<Vec<Url>>,
    hang: bool,
}

impl FakeVerifier {
    pub fn failing(times: usize) -> Self {
        let verifier = Self::default();
        for _ in 0..times {
            verifier.script.lock().unwrap().push_back(Err(VerifyError::Status {
                url: "http://10.0.0.2:9200/".into(),
                status: 503,
            }));
        }
        verifier
    }

    /// Every request stays unanswered.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> Vec<Url> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Verifier for FakeVerifier {
    async fn verify(&self, url: &Url, _timeout: Duration) -> Result<(), VerifyError> {
        self.attempts.lock().unwrap().push(url.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<AlertMessage>>,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.subject).collect()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A controller wired to fakes, with handles on each of them.
pub struct Harness {
    pub controller: FailoverController,
    pub measurer: Arc<FakeMeasurer>,
    pub executor: Arc<FakeExecutor>,
    pub verifier: Arc<FakeVerifier>,
    pub mailer: Arc<FakeMailer>,
}

impl Harness {
    pub fn new(config: &FailoverConfig, executor: FakeExecutor, verifier: FakeVerifier) -> Self {
        let measurer = Arc::new(FakeMeasurer::default());
        let executor = Arc::new(executor);
        let verifier = Arc::new(verifier);
        let mailer = Arc::new(FakeMailer::default());

        let controller = FailoverController::new(
            config,
            Collaborators {
                measurer: measurer.clone(),
                executor: executor.clone(),
                verifier: verifier.clone(),
                mailer: mailer.clone(),
            },
        );

        Self {
            controller,
            measurer,
            executor,
            verifier,
            mailer,
        }
    }

    /// Both servers healthy and within thresholds.
    pub fn healthy(&self) {
        self.measurer.set(ServerId::A, 2.0, 0.0);
        self.measurer.set(ServerId::B, 2.5, 0.0);
    }

    /// B far better than A on latency.
    pub fn a_slow(&self) {
        self.measurer.set(ServerId::A, 40.0, 0.0);
        self.measurer.set(ServerId::B, 5.0, 0.0);
    }
}

/// Start a simple mock backend on an ephemeral port that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;

                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    204 => "204 No Content",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    502 => "502 Bad Gateway",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that accepts connections but never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}
