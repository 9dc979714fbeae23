//! Site session: schema holder, statement executor and worker pool.
//!
//! A [`Session`] is cheap to clone; clones share the loaded schema, the
//! transport and the pool.

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value as JsonValue};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::{AbortHandle, JoinSet};
use uuid::Uuid;

use crate::credentials::{cookies_from_set_cookie, Credentials, SET_COOKIE_HEADER};
use crate::error::{LinkError, Result};
use crate::models::{Application, Resource, SchemaModel};
use crate::result::{decode, ResultSet};
use crate::schema;
use crate::statement::get::PAGE_STATE_PARAM;
use crate::statement::request::extract_payload;
use crate::statement::{Method, Statement, StatementRequest};
use crate::timeouts::LinkTimeouts;
use crate::transport::{HttpTransport, Transport, TransportRequest, TransportResponse};

pub const CUSTOMER_ID_HEADER: &str = "customer-id";
pub const SITE_ID_HEADER: &str = "site-id";

/// Path appended to the site url to form the API base
const API_PATH: &str = "/api/v1";

/// Connection to one site of one customer.
///
/// # Examples
///
/// ```rust,no_run
/// use cloudsite_link::{Session, Statement};
///
/// # async fn example() -> cloudsite_link::Result<()> {
/// let session = Session::builder()
///     .base_url("https://api.example.com")
///     .customer_id("0f4b1c52-2d3e-4a5b-9c6d-7e8f9a0b1c2d")
///     .site_id("1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d")
///     .api_key("secret")
///     .build()?;
/// session.init().await?;
///
/// let persons = session.resource("crm", "persons")?;
/// let mut create = persons.create();
/// create.with_param("firstName", "Ann")?;
/// let mut result = session.execute(&mut create).await?;
/// let row = result.one();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api_base: String,
    customer_id: Uuid,
    site_id: Uuid,
    api_key: RwLock<Option<String>>,
    transport: Arc<dyn Transport>,
    timeouts: LinkTimeouts,
    schema: RwLock<Option<Arc<SchemaModel>>>,
    pool: WorkerPool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_base", &self.inner.api_base)
            .field("customer_id", &self.inner.customer_id)
            .field("site_id", &self.inner.site_id)
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// `<url>/api/v1`
    pub fn api_base(&self) -> &str {
        &self.inner.api_base
    }

    pub fn customer_id(&self) -> Uuid {
        self.inner.customer_id
    }

    pub fn site_id(&self) -> Uuid {
        self.inner.site_id
    }

    pub fn timeouts(&self) -> &LinkTimeouts {
        &self.inner.timeouts
    }

    pub fn api_key(&self) -> Option<String> {
        self.inner.api_key.read().clone()
    }

    /// Replace or clear the api key used by later executions.
    pub fn set_api_key(&self, api_key: Option<String>) {
        *self.inner.api_key.write() = api_key;
    }

    /// Fetch and load the site schema. Calling it again reloads the schema
    /// and reopens the worker pool after a [`Session::close`].
    pub async fn init(&self) -> Result<()> {
        let url = format!("{}/init", self.inner.api_base);
        log::debug!("[SITE_INIT] Fetching schema from url={}", url);
        let start = Instant::now();

        let response = self
            .inner
            .transport
            .send(TransportRequest {
                method: Method::Get,
                url,
                query: Vec::new(),
                headers: self.inner.identity_headers(),
                body: None,
            })
            .await?;
        if response.status != 200 {
            log::warn!("[SITE_INIT] Schema request answered with status={}", response.status);
            return Err(LinkError::Execution {
                status: Some(response.status),
                message: format!("site init expected status 200, got {}", response.status),
            });
        }

        let model = schema::load(&response.body)?;
        log::info!(
            "[SITE_INIT] Loaded {} application(s) in {:?}",
            model.applications().count(),
            start.elapsed()
        );
        *self.inner.schema.write() = Some(Arc::new(model));
        self.inner.pool.reopen();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.schema.read().is_some()
    }

    /// The loaded schema model
    pub fn schema(&self) -> Result<Arc<SchemaModel>> {
        self.inner.schema()
    }

    pub fn application_names(&self) -> Result<Vec<String>> {
        Ok(self
            .schema()?
            .application_names()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn application(&self, name: &str) -> Result<Application> {
        self.schema()?.application(name).cloned()
    }

    pub fn resource(&self, application: &str, resource: &str) -> Result<Arc<Resource>> {
        self.schema()?.resource(application, resource)
    }

    /// Execute on the caller's task, authorized by the api key.
    pub async fn execute<S>(&self, statement: &mut S) -> Result<ResultSet>
    where
        S: Statement + ?Sized,
    {
        self.inner.schema()?;
        let credentials = self.inner.key_credentials();
        self.inner.run(statement, credentials).await
    }

    /// Execute authorized by user session cookies, falling back to the api
    /// key when `cookies` is empty.
    pub async fn execute_with_cookies<S>(&self, statement: &mut S, cookies: &[String]) -> Result<ResultSet>
    where
        S: Statement + ?Sized,
    {
        self.inner.schema()?;
        let credentials = self.inner.cookie_credentials(cookies);
        self.inner.run(statement, credentials).await
    }

    /// Submit to the worker pool. The statement moves into the task and is
    /// handed back through the [`ExecutionHandle`].
    ///
    /// A Get statement that is continuing a cursor (`pageState` set) is
    /// rejected; page through it with [`Session::execute`] instead.
    ///
    /// Must be called from within a tokio runtime.
    pub fn execute_async<S>(&self, statement: S) -> Result<ExecutionHandle<S>>
    where
        S: Statement + 'static,
    {
        let credentials = self.inner.key_credentials();
        self.submit(statement, credentials)
    }

    pub fn execute_async_with_cookies<S>(&self, statement: S, cookies: &[String]) -> Result<ExecutionHandle<S>>
    where
        S: Statement + 'static,
    {
        let credentials = self.inner.cookie_credentials(cookies);
        self.submit(statement, credentials)
    }

    fn submit<S>(&self, mut statement: S, credentials: Credentials) -> Result<ExecutionHandle<S>>
    where
        S: Statement + 'static,
    {
        self.inner.schema()?;
        if statement.method() == Method::Get
            && statement.core().query_params().contains_key(PAGE_STATE_PARAM)
        {
            return Err(LinkError::invalid_param(
                PAGE_STATE_PARAM,
                "asynchronous execution cannot continue a cursor",
            ));
        }

        let (sender, receiver) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let abort_handle = self.inner.pool.spawn(async move {
            let result = inner.run(&mut statement, credentials).await;
            // receiver gone means the caller stopped waiting
            let _ = sender.send(Completion { statement, result });
        })?;
        Ok(ExecutionHandle {
            receiver,
            abort_handle,
        })
    }

    /// Stop accepting work and wait up to `timeout` for submitted executions
    /// to finish. Returns `true` if they all finished in time; otherwise the
    /// rest are aborted and `false` is returned.
    pub async fn close(&self, timeout: Duration) -> bool {
        self.inner.pool.close(timeout).await
    }

    /// [`Session::close`] with the configured shutdown timeout.
    pub async fn close_default(&self) -> bool {
        self.close(self.inner.timeouts.shutdown_timeout).await
    }

    /// Stop accepting work and abort everything outstanding. Returns the
    /// number of executions that were aborted.
    pub fn close_now(&self) -> usize {
        self.inner.pool.close_now()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// Executions submitted and not yet reaped
    pub fn pending(&self) -> usize {
        self.inner.pool.pending()
    }

    // ==================== User flows ====================

    pub async fn register(&self, email: &str, password: &str) -> Result<()> {
        log::debug!("[SITE_AUTH] Registering user '{}'", email);
        self.inner
            .user_request("register", Some(credentials_body(email, password)), &[])
            .await?;
        Ok(())
    }

    /// Returns the session cookies (`name=value`) set by the service.
    pub async fn login(&self, email: &str, password: &str) -> Result<Vec<String>> {
        log::debug!("[SITE_AUTH] Authenticating user '{}'", email);
        let response = self
            .inner
            .user_request("login", Some(credentials_body(email, password)), &[])
            .await?;
        let cookies = cookies_from_set_cookie(response.header_values(SET_COOKIE_HEADER));
        if cookies.is_empty() {
            return Err(LinkError::execution("login response carried no session cookies"));
        }
        log::debug!("[SITE_AUTH] User '{}' authenticated", email);
        Ok(cookies)
    }

    pub async fn logout(&self, cookies: &[String]) -> Result<()> {
        self.inner.user_request("logout", None, cookies).await?;
        log::debug!("[SITE_AUTH] Logged out");
        Ok(())
    }

    /// Exchange the session cookies for fresh ones.
    pub async fn refresh(&self, cookies: &[String]) -> Result<Vec<String>> {
        let response = self.inner.user_request("refresh", None, cookies).await?;
        let refreshed = cookies_from_set_cookie(response.header_values(SET_COOKIE_HEADER));
        if refreshed.is_empty() {
            return Err(LinkError::execution("refresh response carried no session cookies"));
        }
        Ok(refreshed)
    }
}

fn credentials_body(email: &str, password: &str) -> JsonValue {
    json!({ "email": email, "password": password })
}

impl SessionInner {
    fn schema(&self) -> Result<Arc<SchemaModel>> {
        self.schema
            .read()
            .clone()
            .ok_or_else(|| LinkError::NotInitialized("call init() to load the site schema".into()))
    }

    fn identity_headers(&self) -> Vec<(String, String)> {
        vec![
            (CUSTOMER_ID_HEADER.to_string(), self.customer_id.to_string()),
            (SITE_ID_HEADER.to_string(), self.site_id.to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
    }

    fn key_credentials(&self) -> Credentials {
        self.api_key
            .read()
            .as_deref()
            .map_or(Credentials::None, Credentials::api_key)
    }

    fn cookie_credentials(&self, cookies: &[String]) -> Credentials {
        Credentials::prefer_cookies(cookies, self.api_key.read().as_deref())
    }

    /// One statement round trip. The statement is `Executed` on a 2xx
    /// answer and `Failed` on anything else.
    async fn run<S>(&self, statement: &mut S, credentials: Credentials) -> Result<ResultSet>
    where
        S: Statement + ?Sized,
    {
        statement.core().ensure_building()?;
        statement.check_ready()?;

        let request = StatementRequest::from_core(statement.core());
        let mut headers = self.identity_headers();
        credentials.apply(&mut headers);
        let transport_request = TransportRequest {
            method: request.method,
            url: format!("{}{}", self.api_base, request.path),
            query: request.query,
            headers,
            body: request.body,
        };

        log::debug!(
            "[STATEMENT] Executing {} on resource '{}'",
            transport_request.method,
            statement.resource().name()
        );
        let outcome = self
            .transport
            .send(transport_request)
            .await
            .map_err(LinkError::from)
            .and_then(|response| {
                if response.is_success() {
                    extract_payload(statement.method(), response.body)
                } else {
                    Err(LinkError::Execution {
                        status: Some(response.status),
                        message: response.body.to_string(),
                    })
                }
            });

        match outcome {
            Ok(payload) => {
                let resource = Arc::clone(statement.resource());
                let page_state = payload.page_state.clone();
                let result = decode(&resource, statement.core().view(), true, payload);
                statement.core_mut().mark_executed(page_state);
                Ok(result)
            }
            Err(err) => {
                log::warn!("[STATEMENT] Execution failed: {}", err);
                statement.core_mut().mark_failed();
                Err(err)
            }
        }
    }

    async fn user_request(
        &self,
        action: &str,
        body: Option<JsonValue>,
        cookies: &[String],
    ) -> Result<TransportResponse> {
        let mut headers = self.identity_headers();
        Credentials::cookies(cookies.to_vec()).apply(&mut headers);
        let response = self
            .transport
            .send(TransportRequest {
                method: Method::Post,
                url: format!("{}/users/{}", self.api_base, action),
                query: Vec::new(),
                headers,
                body,
            })
            .await
            .map_err(|e| {
                log::warn!("[SITE_AUTH] User {} failed: {}", action, e);
                LinkError::from(e)
            })?;
        if !response.is_success() {
            return Err(LinkError::Execution {
                status: Some(response.status),
                message: format!("user {} answered with status {}", action, response.status),
            });
        }
        Ok(response)
    }
}

// ==================== Worker pool ====================

/// Bounded pool of executions. Tasks are spawned eagerly and wait for a
/// permit, so at most `max_workers` transport calls are in flight.
struct WorkerPool {
    tasks: Mutex<JoinSet<()>>,
    permits: Arc<Semaphore>,
    max_workers: usize,
    closed: AtomicBool,
}

impl WorkerPool {
    fn new(max_workers: usize) -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            closed: AtomicBool::new(false),
        }
    }

    fn spawn<F>(&self, work: F) -> Result<AbortHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::SessionClosed);
        }
        // reap finished tasks
        while tasks.try_join_next().is_some() {}

        let permits = Arc::clone(&self.permits);
        let handle = tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            work.await;
        });
        log::debug!(
            "[SITE_POOL] Submitted execution (pending={}, max_workers={})",
            tasks.len(),
            self.max_workers
        );
        Ok(handle)
    }

    async fn close(&self, timeout: Duration) -> bool {
        let mut tasks = {
            let mut guard = self.tasks.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };
        if tasks.is_empty() {
            return true;
        }

        log::debug!("[SITE_POOL] Waiting up to {:?} for {} execution(s)", timeout, tasks.len());
        let drained = tokio::time::timeout(timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        match drained {
            Ok(()) => true,
            Err(_) => {
                log::warn!(
                    "[SITE_POOL] Graceful shutdown timed out, aborting {} execution(s)",
                    tasks.len()
                );
                tasks.abort_all();
                false
            }
        }
    }

    fn close_now(&self) -> usize {
        let mut tasks = self.tasks.lock();
        self.closed.store(true, Ordering::Release);
        while tasks.try_join_next().is_some() {}
        let aborted = tasks.len();
        tasks.abort_all();
        if aborted > 0 {
            log::warn!("[SITE_POOL] Aborted {} execution(s)", aborted);
        }
        aborted
    }

    fn reopen(&self) {
        let _tasks = self.tasks.lock();
        if self.closed.swap(false, Ordering::AcqRel) {
            log::debug!("[SITE_POOL] Reopened for new executions");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }
}

/// Statement handed back by an asynchronous execution, with its result.
#[derive(Debug)]
pub struct Completion<S> {
    pub statement: S,
    pub result: Result<ResultSet>,
}

impl<S> Completion<S> {
    pub fn into_parts(self) -> (S, Result<ResultSet>) {
        (self.statement, self.result)
    }
}

/// Pending asynchronous execution.
///
/// Resolves to the [`Completion`], or to [`LinkError::Cancelled`] if the
/// execution was aborted (by [`ExecutionHandle::cancel`] or a pool shutdown)
/// before it delivered a result.
#[derive(Debug)]
pub struct ExecutionHandle<S> {
    receiver: oneshot::Receiver<Completion<S>>,
    abort_handle: AbortHandle,
}

impl<S> ExecutionHandle<S> {
    /// Abort the execution. One that has not started never reaches the
    /// service; one already in flight still reaches it, but its result is
    /// dropped.
    pub fn cancel(&self) {
        self.abort_handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort_handle.is_finished()
    }
}

impl<S> Future for ExecutionHandle<S> {
    type Output = Result<Completion<S>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.map_err(|_| LinkError::Cancelled))
    }
}

// ==================== Builder ====================

/// Builder for [`Session`]
pub struct SessionBuilder {
    base_url: Option<String>,
    customer_id: Option<String>,
    site_id: Option<String>,
    api_key: Option<String>,
    max_workers: usize,
    timeouts: LinkTimeouts,
    transport: Option<Arc<dyn Transport>>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            customer_id: None,
            site_id: None,
            api_key: None,
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            timeouts: LinkTimeouts::default(),
            transport: None,
        }
    }

    /// Site url, without the `/api/v1` suffix
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn customer_id(mut self, id: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    pub fn site_id(mut self, id: impl Into<String>) -> Self {
        self.site_id = Some(id.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Concurrent executions in the async pool (at least 1)
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the reqwest transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Session> {
        let base_url = self
            .base_url
            .ok_or_else(|| LinkError::Configuration("base_url is required".into()))?;
        let parsed = reqwest::Url::parse(base_url.trim())
            .map_err(|e| LinkError::Configuration(format!("invalid base_url '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LinkError::Configuration(format!(
                "base_url '{}' must use http or https",
                base_url
            )));
        }
        let customer_id = parse_id("customer_id", self.customer_id)?;
        let site_id = parse_id("site_id", self.site_id)?;
        if self.max_workers == 0 {
            return Err(LinkError::Configuration("max_workers must be at least 1".into()));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.timeouts)?),
        };
        let api_base = format!("{}{}", base_url.trim().trim_end_matches('/'), API_PATH);
        log::debug!(
            "[SITE_INIT] Session for site {} at {} (max_workers={})",
            site_id,
            api_base,
            self.max_workers
        );

        Ok(Session {
            inner: Arc::new(SessionInner {
                api_base,
                customer_id,
                site_id,
                api_key: RwLock::new(self.api_key.filter(|k| !k.is_empty())),
                transport,
                timeouts: self.timeouts,
                schema: RwLock::new(None),
                pool: WorkerPool::new(self.max_workers),
            }),
        })
    }
}

fn parse_id(field: &str, value: Option<String>) -> Result<Uuid> {
    let value = value.ok_or_else(|| LinkError::Configuration(format!("{} is required", field)))?;
    Uuid::parse_str(value.trim())
        .map_err(|e| LinkError::Configuration(format!("invalid {} '{}': {}", field, value, e)))
}
