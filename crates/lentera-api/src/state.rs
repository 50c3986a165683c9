//! Application state management

use crate::auth::jwt::JwtManager;
use crate::auth::one_time_token::OneTimeTokenService;
use crate::cache::CacheStore;
use crate::mail::{Email, MailQueue, Mailer};
use crate::storage::ObjectStorage;
use lentera_core::config::AppConfig;
use lentera_core::db::{
    BlogStore, ClassStore, EnrollmentStore, MeetingSessionStore, SessionRepository,
    StaticAssetStore, TestimonyStore, UserStore,
};
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// PostgreSQL pool behind every store
    pub db: PgPool,
    /// Session token signer
    pub jwt: JwtManager,
    /// Current refresh token per user
    pub sessions: Arc<dyn SessionRepository>,
    /// Activation, verification and reset tokens
    pub tokens: OneTimeTokenService,
    pub cache: Arc<dyn CacheStore>,
    /// Uploaded images
    pub storage: Arc<dyn ObjectStorage>,
    /// Background email delivery
    pub mail: MailQueue,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Wire the shared services; spawns the mail worker, so it must run
    /// inside a tokio runtime
    pub fn new(
        config: AppConfig,
        db: PgPool,
        sessions: Arc<dyn SessionRepository>,
        cache: Arc<dyn CacheStore>,
        storage: Arc<dyn ObjectStorage>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let (mail, _worker) = MailQueue::start(mailer, &config.mail);

        Self {
            jwt: JwtManager::from_config(&config.auth),
            tokens: OneTimeTokenService::new(cache.clone()),
            config,
            db,
            sessions,
            cache,
            storage,
            mail,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.db.clone())
    }

    pub fn classes(&self) -> ClassStore {
        ClassStore::new(self.db.clone())
    }

    pub fn enrollments(&self) -> EnrollmentStore {
        EnrollmentStore::new(self.db.clone())
    }

    pub fn meeting_sessions(&self) -> MeetingSessionStore {
        MeetingSessionStore::new(self.db.clone())
    }

    pub fn blogs(&self) -> BlogStore {
        BlogStore::new(self.db.clone())
    }

    pub fn testimonies(&self) -> TestimonyStore {
        TestimonyStore::new(self.db.clone())
    }

    pub fn static_assets(&self) -> StaticAssetStore {
        StaticAssetStore::new(self.db.clone())
    }

    /// Queue an email for background delivery
    pub fn send_mail(&self, email: Email) {
        self.mail.enqueue(email);
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
