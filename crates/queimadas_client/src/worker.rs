//! Background fetch worker.

use crate::api::ApiClient;
use crossbeam_channel::{unbounded, Receiver, Sender};
use queimadas_core::{FetchCmd, FetchEvent, FetchSource};
use std::io;
use std::thread;

/// Handle for sending commands to, and receiving events from, the fetch worker.
pub struct BackendHandle {
    pub cmd_tx: Sender<FetchCmd>,
    pub evt_rx: Receiver<FetchEvent>,
}

fn send_event(evt_tx: &Sender<FetchEvent>, event: FetchEvent) {
    if evt_tx.send(event).is_err() {
        tracing::debug!("fetch event dropped: handle closed");
    }
}

/// Spawn the worker thread that performs backend requests.
///
/// Commands are served in the order they arrive. Every fires-count command
/// produces exactly one reply, either [`FetchEvent::FiresCount`] or
/// [`FetchEvent::Failed`], so the dashboard's loading counter always settles.
///
/// # Returns
/// A [`BackendHandle`] containing the command sender and event receiver.
///
/// # Errors
/// Returns an error if the async runtime or the thread cannot be created.
pub fn spawn_backend(client: ApiClient) -> io::Result<BackendHandle> {
    let (cmd_tx, cmd_rx) = unbounded();
    let (evt_tx, evt_rx) = unbounded();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("queimadas-fetch".to_string())
        .spawn(move || {
            for cmd in cmd_rx.iter() {
                match cmd {
                    FetchCmd::FiresCount(query) => {
                        let event = match runtime.block_on(client.fires_count(&query)) {
                            Ok(response) => FetchEvent::FiresCount {
                                epoch: query.epoch,
                                response,
                            },
                            Err(err) => {
                                tracing::error!(graphic = %query.id, "fires count failed: {}", err);
                                FetchEvent::Failed {
                                    source: FetchSource::FiresCount {
                                        epoch: query.epoch,
                                        graphic_id: query.id.clone(),
                                    },
                                    message: err.user_message(),
                                }
                            }
                        };
                        send_event(&evt_tx, event);
                    }
                    FetchCmd::FeatureInfo { url } => {
                        let event = match runtime.block_on(client.feature_info(&url)) {
                            Ok(response) => FetchEvent::FeatureInfo { response },
                            Err(err) => {
                                tracing::error!("feature info failed: {}", err);
                                FetchEvent::Failed {
                                    source: FetchSource::FeatureInfo,
                                    message: err.user_message(),
                                }
                            }
                        };
                        send_event(&evt_tx, event);
                    }
                    FetchCmd::Shutdown => break,
                }
            }
            tracing::debug!("fetch worker stopped");
        })?;

    Ok(BackendHandle { cmd_tx, evt_rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use queimadas_core::graphics::{FiresCountQuery, GraphicsScope};
    use queimadas_core::models::graphic::FilterRules;
    use queimadas_core::{Config, FilterEpoch};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    struct StubServer {
        _runtime: tokio::runtime::Runtime,
        url: String,
    }

    fn stub_server() -> StubServer {
        let app = Router::new()
            .route(
                "/graphicsfirescount",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let ignore_city = params
                        .get("filterRules[ignoreCityFilter]")
                        .is_some_and(|value| value == "true");
                    if params.get("id").is_some_and(|id| id == "broken") {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "database offline" })),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "firesCount": {
                                "rows": [{ "satelite": params.get("satellites"), "count": 7 }],
                                "rowCount": 1
                            },
                            "firesTotalCount": { "rows": [{ "count": 7 }], "rowCount": 1 },
                            "y": params.get("y"),
                            "id": params.get("id"),
                            "filterRules": { "ignoreCityFilter": ignore_city }
                        })),
                    )
                }),
            )
            .route(
                "/proxy",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "requestId": params.get("requestId"),
                        "msg": { "features": [{ "properties": {
                            "foco_id": params.get("url"),
                            "format": params.get("format")
                        } }] }
                    }))
                }),
            );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("stub runtime");
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        runtime.spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });
        StubServer {
            _runtime: runtime,
            url: format!("http://{}/", addr),
        }
    }

    fn backend_for(url: &str) -> BackendHandle {
        let client = ApiClient::new(&Config {
            server_url: url.to_string(),
            request_timeout_secs: 5,
            ..Config::default()
        })
        .expect("client");
        spawn_backend(client).expect("spawn backend")
    }

    fn query(id: &str, epoch: u64) -> FiresCountQuery {
        FiresCountQuery {
            epoch: FilterEpoch(epoch),
            id: id.to_string(),
            y: "{satelite}".to_string(),
            key: String::new(),
            limit: None,
            title: "Fires".to_string(),
            scope: GraphicsScope {
                satellites: "AQUA_M-T".to_string(),
                ..GraphicsScope::default()
            },
            filter_rules: FilterRules {
                ignore_city_filter: true,
                ..FilterRules::default()
            },
        }
    }

    fn recv_event(rx: &Receiver<FetchEvent>) -> FetchEvent {
        rx.recv_timeout(Duration::from_secs(5))
            .expect("expected fetch event")
    }

    #[test]
    fn fires_count_reply_carries_request_epoch() {
        let server = stub_server();
        let backend = backend_for(&server.url);

        backend
            .cmd_tx
            .send(FetchCmd::FiresCount(query("firesBySatellite", 3)))
            .expect("send fires count");

        match recv_event(&backend.evt_rx) {
            FetchEvent::FiresCount { epoch, response } => {
                assert_eq!(epoch, FilterEpoch(3));
                assert_eq!(response.id, "firesBySatellite");
                assert_eq!(response.y, "{satelite}");
                assert_eq!(response.total_count(), 7.0);
                assert!(response.filter_rules.ignore_city_filter);
                assert_eq!(
                    response.fires_count.rows[0].get("satelite"),
                    Some(&Value::from("AQUA_M-T"))
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn backend_errors_become_failed_events() {
        let server = stub_server();
        let backend = backend_for(&server.url);

        backend
            .cmd_tx
            .send(FetchCmd::FiresCount(query("broken", 9)))
            .expect("send fires count");

        match recv_event(&backend.evt_rx) {
            FetchEvent::Failed { source, message } => {
                assert_eq!(
                    source,
                    FetchSource::FiresCount {
                        epoch: FilterEpoch(9),
                        graphic_id: "broken".to_string()
                    }
                );
                assert_eq!(message, "database offline");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn feature_info_is_relayed_through_proxy() {
        let server = stub_server();
        let backend = backend_for(&server.url);
        let wms = "http://maps/wms?REQUEST=GetFeatureInfo&FEATURE_COUNT=30";

        backend
            .cmd_tx
            .send(FetchCmd::FeatureInfo {
                url: wms.to_string(),
            })
            .expect("send feature info");

        match recv_event(&backend.evt_rx) {
            FetchEvent::FeatureInfo { response } => {
                assert_eq!(response.request_id, "GetFeatureInfoTool");
                let properties = &response.msg.features[0].properties;
                assert_eq!(properties.get("foco_id"), Some(&Value::from(wms)));
                assert_eq!(properties.get("format"), Some(&Value::from("json")));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unreachable_backend_fails_and_shutdown_stops_worker() {
        let backend = backend_for("http://127.0.0.1:9/");

        backend
            .cmd_tx
            .send(FetchCmd::FeatureInfo {
                url: "http://maps/wms".to_string(),
            })
            .expect("send feature info");
        match recv_event(&backend.evt_rx) {
            FetchEvent::Failed { source, .. } => assert_eq!(source, FetchSource::FeatureInfo),
            other => panic!("unexpected event: {:?}", other),
        }

        backend.cmd_tx.send(FetchCmd::Shutdown).expect("send shutdown");
        assert!(backend
            .evt_rx
            .recv_timeout(Duration::from_secs(5))
            .is_err());
    }
}
