use crate::application::services::Connectivity;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Polls the clinic API and publishes the result as the online flag.
pub struct ReachabilityMonitor {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    connectivity: Connectivity,
}

impl ReachabilityMonitor {
    pub fn new(config: &RemoteConfig, connectivity: Connectivity) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self {
            client,
            url: config.base_url.trim_end_matches('/').to_string(),
            interval: Duration::from_secs(config.probe_interval.max(1)),
            connectivity,
        })
    }

    /// Any HTTP response means the server is reachable; only transport
    /// failures count as offline.
    pub async fn poll_once(&self) -> bool {
        let online = match self.client.head(&self.url).send().await {
            Ok(response) => {
                tracing::trace!(
                    target: "offline::connectivity",
                    status = response.status().as_u16(),
                    "clinic api reachable"
                );
                true
            }
            Err(err) => {
                tracing::debug!(
                    target: "offline::connectivity",
                    url = %self.url,
                    error = %err,
                    "clinic api unreachable"
                );
                false
            }
        };
        self.connectivity.set_online(online);
        online
    }

    /// Poll until `shutdown` flips to `true`. The first check runs immediately.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.poll_once().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    fn config(base_url: String) -> RemoteConfig {
        RemoteConfig {
            base_url,
            request_timeout: 2,
            auth_token: None,
            probe_interval: 1,
        }
    }

    async fn spawn_server() -> (String, JoinHandle<()>) {
        let app = Router::new().route("/", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), handle)
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn any_http_response_counts_as_online() {
        let (base, server) = spawn_server().await;
        let connectivity = Connectivity::new(false);
        let monitor = ReachabilityMonitor::new(&config(base), connectivity.clone()).unwrap();

        assert!(monitor.poll_once().await);
        assert!(connectivity.is_online());
        server.abort();
    }

    #[tokio::test]
    async fn refused_connection_goes_offline() {
        let connectivity = Connectivity::new(true);
        let monitor =
            ReachabilityMonitor::new(&config(closed_port_url()), connectivity.clone()).unwrap();

        assert!(!monitor.poll_once().await);
        assert!(!connectivity.is_online());
    }

    #[tokio::test]
    async fn spawned_monitor_reports_online_and_stops_on_shutdown() {
        let (base, server) = spawn_server().await;
        let connectivity = Connectivity::new(false);
        let mut online = connectivity.subscribe();
        let monitor = ReachabilityMonitor::new(&config(base), connectivity.clone()).unwrap();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let handle = monitor.spawn(shutdown_rx);
        tokio::time::timeout(Duration::from_secs(5), online.wait_for(|online| *online))
            .await
            .unwrap()
            .unwrap();

        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        server.abort();
    }
}
