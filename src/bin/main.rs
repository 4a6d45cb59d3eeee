use std::sync::Arc;
use std::time::Duration;

use attendance_ledger::ledger::SystemClock;
use attendance_ledger::rpc;
use attendance_ledger::service::{EventPublisher, RedisSnapshotStore, SnapshotStore};
use attendance_ledger::{JwtIdentityProvider, LedgerService, LedgerSettings};
use futures_util::StreamExt;
use log::{error, info, warn};
use tokio::sync::broadcast::error::RecvError;

const NATS_RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let settings = LedgerSettings::from_env()?;
    info!("Ledger owner: {}", settings.owner);

    let store: Option<Arc<dyn SnapshotStore>> = match &settings.redis_url {
        Some(url) => {
            let redis_client = Arc::new(redis::Client::open(url.as_str())?);
            Some(Arc::new(RedisSnapshotStore::new(
                redis_client,
                settings.redis_snapshot_key.clone(),
            )))
        }
        None => {
            warn!("REDIS_URL not set, ledger state will not survive a restart");
            None
        }
    };

    let service = Arc::new(
        LedgerService::open(
            settings.owner,
            settings.limits(),
            Arc::new(SystemClock),
            store,
            settings.event_feed_capacity,
        )
        .await?,
    );
    let identities = JwtIdentityProvider::from_secret(settings.jwt_secret.as_bytes());

    let nats_client = connect_nats(&settings.nats_url).await;

    // Fan committed events out to observers
    let publisher = EventPublisher::new(
        Some(nats_client.clone()),
        settings.nats_event_subject.clone(),
    );
    let mut feed = service.subscribe();
    tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(record) => publisher.publish(&record).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Event publisher lagged, {} events skipped (replayable from the log)",
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut commands = nats_client
        .subscribe(settings.nats_command_subject.clone())
        .await?;
    info!("Listening for commands on {}", settings.nats_command_subject);

    // Requests are handled one at a time; NATS holds the queue.
    while let Some(message) = commands.next().await {
        let response = rpc::dispatch(&service, &identities, &message.payload).await;
        match message.reply {
            Some(reply) => {
                if let Err(e) = nats_client.publish(reply, response.into()).await {
                    error!("Failed to publish response: {}", e);
                }
            }
            None => warn!("Request on {} has no reply subject", message.subject),
        }
    }

    Ok(())
}

async fn connect_nats(url: &str) -> async_nats::Client {
    loop {
        match async_nats::connect(url).await {
            Ok(client) => {
                info!("Successfully connected to NATS server at {}", url);
                return client;
            }
            Err(e) => {
                error!(
                    "Failed to connect to NATS server: {}. Retrying in {:?}...",
                    e, NATS_RETRY_INTERVAL
                );
                tokio::time::sleep(NATS_RETRY_INTERVAL).await;
            }
        }
    }
}
