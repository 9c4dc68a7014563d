// Authentication context
// Wires the store, HTTP client, refresher, executor and session together

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

use crate::auth::{
    AuthExecutor, AuthService, Session, SessionEpoch, SessionState, TokenRefresher,
};
use crate::config::Config;
use crate::http_client::MirimHttpClient;
use crate::services::{
    AdminService, ConsentService, NoticeService, OAuthClientService, ProfileService,
};
use crate::store::{CredentialStore, FileStore};

const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Everything an application needs to make authenticated calls
///
/// Built once per process. All parts share one credential store and one
/// session channel, so a refresh performed on behalf of any service is seen
/// by every other.
pub struct AuthContext {
    http: MirimHttpClient,
    store: Arc<dyn CredentialStore>,
    executor: Arc<AuthExecutor>,
    auth: AuthService,
    session: Session,
}

impl AuthContext {
    /// Build a context backed by the credential file named in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let store = FileStore::open(&config.credentials_file)?;
        let http = MirimHttpClient::new(
            &config.api_url,
            config.http_connect_timeout,
            config.http_request_timeout,
        )?;

        tracing::debug!(
            api_url = %config.api_url,
            credentials = %config.credentials_file.display(),
            "Building auth context"
        );

        Ok(Self::from_parts(http, Arc::new(store)))
    }

    /// Build a context around an existing store, with default timeouts
    pub fn with_store(base_url: &str, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let http =
            MirimHttpClient::new(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)?;
        Ok(Self::from_parts(http, store))
    }

    fn from_parts(http: MirimHttpClient, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::anonymous());
        let state = Arc::new(state);
        let epoch = Arc::new(SessionEpoch::new());

        let refresher = Arc::new(TokenRefresher::new(
            http.clone(),
            store.clone(),
            state.clone(),
            epoch.clone(),
        ));
        let executor = Arc::new(AuthExecutor::new(store.clone(), refresher));
        let auth = AuthService::new(http.clone(), executor.clone());
        let session = Session::new(store.clone(), state, epoch, auth.clone());

        Self {
            http,
            store,
            executor,
            auth,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn executor(&self) -> &Arc<AuthExecutor> {
        &self.executor
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn oauth_clients(&self) -> OAuthClientService {
        OAuthClientService::new(self.http.clone(), self.executor.clone())
    }

    pub fn notices(&self) -> NoticeService {
        NoticeService::new(self.http.clone(), self.executor.clone())
    }

    pub fn profile(&self) -> ProfileService {
        ProfileService::new(self.http.clone(), self.executor.clone())
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(self.http.clone(), self.executor.clone())
    }

    pub fn consent(&self) -> ConsentService {
        ConsentService::new(self.http.clone(), self.executor.clone())
    }

    /// Drop any in-flight refresh so nothing outlives the context
    pub fn dispose(self) {
        self.executor.reset();
        tracing::debug!("Auth context disposed");
    }
}
