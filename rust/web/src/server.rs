use crate::events::EventBus;
use crate::handlers;
use crate::network::{NetworkHandle, NetworkServer};
use crate::room::RoomManager;
use crate::settings::{AppSettings, SettingsError, SettingsStore};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use warp::filters::BoxedFilter;
use warp::reply::Reply;
use warp::Filter;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    tcp_port: Option<u16>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tcp_port: None,
        }
    }

    /// Also serve the length-prefixed TCP protocol on `port`.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = Some(port);
        self
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tcp_port(&self) -> Option<u16> {
        self.tcp_port
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: EventBus,
    settings: Arc<SettingsStore>,
    rooms: Arc<RoomManager>,
}

impl AppContext {
    pub fn new(config: ServerConfig, settings: AppSettings) -> Result<Self, ServerError> {
        Ok(Self::with_store(config, SettingsStore::with_settings(settings)?))
    }

    fn with_store(config: ServerConfig, store: SettingsStore) -> Self {
        let settings = Arc::new(store);
        let event_bus = EventBus::new();
        let rooms = Arc::new(RoomManager::new(event_bus.clone(), Arc::clone(&settings)));
        Self {
            config,
            event_bus,
            settings,
            rooms,
        }
    }

    pub fn new_for_tests() -> Self {
        Self::with_store(ServerConfig::for_tests(), SettingsStore::new())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> EventBus {
        self.event_bus.clone()
    }

    pub fn settings(&self) -> Arc<SettingsStore> {
        Arc::clone(&self.settings)
    }

    pub fn rooms(&self) -> Arc<RoomManager> {
        Arc::clone(&self.rooms)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig, settings: AppSettings) -> Result<Self, ServerError> {
        let context = AppContext::new(config, settings)?;
        Ok(Self { context })
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let config = context.config().clone();
        let bind_addr = Self::bind_addr(&config, config.port())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        info!(%addr, "web server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        let network = match config.tcp_port() {
            Some(port) => {
                let tcp_addr = Self::bind_addr(&config, port)?;
                Some(NetworkServer::new(context.rooms()).start(tcp_addr).await?)
            }
            None => None,
        };

        let rooms = context.rooms();
        let cleanup = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let rooms = Arc::clone(&rooms);
                match tokio::task::spawn_blocking(move || rooms.cleanup_finished()).await {
                    Ok(closed) if !closed.is_empty() => {
                        info!(rooms = ?closed, "closed finished rooms");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "room cleanup failed"),
                }
            }
        });

        Ok(ServerHandle {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            network,
            cleanup: Some(cleanup),
            context,
        })
    }

    fn bind_addr(config: &ServerConfig, port: u16) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        let candidate = format!("{}:{}", host, port);
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    /// Every HTTP route of the server, also used directly by `warp::test` in tests.
    pub fn routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let health = Self::health_route(context);
        let room_routes = Self::room_routes(context);
        let seat_routes = Self::seat_routes(context);
        let settings_routes = Self::settings_routes(context);
        let sse_routes = Self::sse_routes(context);

        health
            .or(sse_routes)
            .unify()
            .or(seat_routes)
            .unify()
            .or(room_routes)
            .unify()
            .or(settings_routes)
            .unify()
            .boxed()
    }

    fn health_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .and(Self::with_rooms(context.rooms()))
            .map(|rooms: Arc<RoomManager>| handlers::health(&rooms).into_response())
            .boxed()
    }

    fn room_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let rooms = context.rooms();

        let list = warp::path!("api" / "rooms")
            .and(warp::get())
            .and(Self::with_rooms(rooms.clone()))
            .and_then(|rooms: Arc<RoomManager>| async move {
                Ok::<_, Infallible>(handlers::list_rooms(rooms).await)
            });

        let create = warp::path!("api" / "rooms")
            .and(warp::post())
            .and(Self::with_rooms(rooms.clone()))
            .and(warp::body::json())
            .and_then(
                |rooms: Arc<RoomManager>, request: handlers::CreateRoomRequest| async move {
                    Ok::<_, Infallible>(handlers::create_room(rooms, request).await)
                },
            );

        let info = warp::path!("api" / "rooms" / String)
            .and(warp::get())
            .and(Self::with_rooms(rooms.clone()))
            .and_then(|code: String, rooms: Arc<RoomManager>| async move {
                Ok::<_, Infallible>(handlers::get_room(rooms, code).await)
            });

        let delete = warp::path!("api" / "rooms" / String)
            .and(warp::delete())
            .and(Self::with_rooms(rooms.clone()))
            .and_then(|code: String, rooms: Arc<RoomManager>| async move {
                Ok::<_, Infallible>(handlers::delete_room(rooms, code).await)
            });

        let join = warp::path!("api" / "rooms" / String / "join")
            .and(warp::post())
            .and(Self::with_rooms(rooms.clone()))
            .and(warp::body::json())
            .and_then(
                |code: String, rooms: Arc<RoomManager>, request: handlers::PlayerRequest| async move {
                    Ok::<_, Infallible>(handlers::join_room(rooms, code, request).await)
                },
            );

        let leave = warp::path!("api" / "rooms" / String / "leave")
            .and(warp::post())
            .and(Self::with_rooms(rooms.clone()))
            .and(warp::body::json())
            .and_then(
                |code: String, rooms: Arc<RoomManager>, request: handlers::SeatRequest| async move {
                    Ok::<_, Infallible>(handlers::leave_room(rooms, code, request).await)
                },
            );

        let reconnect = warp::path!("api" / "rooms" / String / "reconnect")
            .and(warp::post())
            .and(Self::with_rooms(rooms.clone()))
            .and(warp::body::json())
            .and_then(
                |code: String, rooms: Arc<RoomManager>, request: handlers::SeatRequest| async move {
                    Ok::<_, Infallible>(handlers::reconnect(rooms, code, request).await)
                },
            );

        let start = warp::path!("api" / "rooms" / String / "start")
            .and(warp::post())
            .and(Self::with_rooms(rooms))
            .and_then(|code: String, rooms: Arc<RoomManager>| async move {
                Ok::<_, Infallible>(handlers::start_room(rooms, code).await)
            });

        list.or(create)
            .unify()
            .or(info)
            .unify()
            .or(delete)
            .unify()
            .or(join)
            .unify()
            .or(leave)
            .unify()
            .or(reconnect)
            .unify()
            .or(start)
            .unify()
            .boxed()
    }

    fn seat_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let rooms = context.rooms();

        let pending = warp::path!("api" / "rooms" / String / "players" / String / "decision")
            .and(warp::get())
            .and(Self::with_rooms(rooms.clone()))
            .and(Self::seat_token())
            .and_then(
                |code: String, name: String, rooms: Arc<RoomManager>, token: Option<String>| async move {
                    Ok::<_, Infallible>(handlers::get_decision(rooms, code, name, token).await)
                },
            );

        let answer = warp::path!("api" / "rooms" / String / "players" / String / "decision")
            .and(warp::post())
            .and(Self::with_rooms(rooms.clone()))
            .and(Self::seat_token())
            .and(warp::body::json())
            .and_then(
                |code: String,
                 name: String,
                 rooms: Arc<RoomManager>,
                 token: Option<String>,
                 response: kabo_engine::protocol::DecisionResponse| async move {
                    Ok::<_, Infallible>(
                        handlers::submit_decision(rooms, code, name, token, response).await,
                    )
                },
            );

        let state = warp::path!("api" / "rooms" / String / "players" / String / "state")
            .and(warp::get())
            .and(Self::with_rooms(rooms))
            .and(Self::seat_token())
            .and_then(
                |code: String, name: String, rooms: Arc<RoomManager>, token: Option<String>| async move {
                    Ok::<_, Infallible>(handlers::get_state(rooms, code, name, token).await)
                },
            );

        pending.or(answer).unify().or(state).unify().boxed()
    }

    fn sse_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let rooms = context.rooms();

        let player = warp::path!("api" / "rooms" / String / "players" / String / "events")
            .and(warp::get())
            .and(Self::with_rooms(rooms.clone()))
            .and(Self::seat_token())
            .and_then(
                |code: String, name: String, rooms: Arc<RoomManager>, token: Option<String>| async move {
                    Ok::<_, Infallible>(
                        handlers::stream_player_events(rooms, code, name, token).await,
                    )
                },
            );

        let spectator = warp::path!("api" / "rooms" / String / "events")
            .and(warp::get())
            .and(Self::with_rooms(rooms))
            .and_then(|code: String, rooms: Arc<RoomManager>| async move {
                Ok::<_, Infallible>(handlers::stream_room_events(rooms, code).await)
            });

        player.or(spectator).unify().boxed()
    }

    fn settings_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let settings = context.settings();

        let get = warp::path!("api" / "settings")
            .and(warp::get())
            .and(Self::with_settings(settings.clone()))
            .and_then(|store: Arc<SettingsStore>| async move {
                Ok::<_, Infallible>(handlers::get_settings(store).await)
            });

        let update = warp::path!("api" / "settings")
            .and(warp::put())
            .and(Self::with_settings(settings.clone()))
            .and(warp::body::json())
            .and_then(
                |store: Arc<SettingsStore>, request: handlers::UpdateSettingsRequest| async move {
                    Ok::<_, Infallible>(handlers::update_settings(store, request).await)
                },
            );

        let field = warp::path!("api" / "settings" / "field")
            .and(warp::patch())
            .and(Self::with_settings(settings.clone()))
            .and(warp::body::json())
            .and_then(
                |store: Arc<SettingsStore>, request: handlers::UpdateFieldRequest| async move {
                    Ok::<_, Infallible>(handlers::update_field(store, request).await)
                },
            );

        let reset = warp::path!("api" / "settings" / "reset")
            .and(warp::post())
            .and(Self::with_settings(settings))
            .and_then(|store: Arc<SettingsStore>| async move {
                Ok::<_, Infallible>(handlers::reset_settings(store).await)
            });

        get.or(update)
            .unify()
            .or(field)
            .unify()
            .or(reset)
            .unify()
            .boxed()
    }

    fn with_rooms(
        rooms: Arc<RoomManager>,
    ) -> impl Filter<Extract = (Arc<RoomManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&rooms))
    }

    fn seat_token() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
        warp::header::optional::<String>(handlers::SEAT_TOKEN_HEADER)
    }

    fn with_settings(
        settings: Arc<SettingsStore>,
    ) -> impl Filter<Extract = (Arc<SettingsStore>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&settings))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    network: Option<NetworkHandle>,
    cleanup: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn tcp_address(&self) -> Option<SocketAddr> {
        self.network.as_ref().map(NetworkHandle::address)
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Stops both front ends and closes every room.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.abort();
        }
        if let Some(network) = self.network.take() {
            network.shutdown().await;
        }
        // Game threads are joined off the async workers.
        let rooms = self.context.rooms();
        let closed = tokio::task::spawn_blocking(move || {
            for code in rooms.active_rooms() {
                let _ = rooms.teardown_room(&code);
            }
        })
        .await;
        if let Err(err) = closed {
            warn!(error = %err, "closing rooms failed");
        }

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        info!("server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.abort();
        }

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
