//! Recording test doubles for the three backend services
//!
//! Every call is appended to one shared journal so tests can assert both
//! call counts and cross-service ordering.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Barrier, Notify};

use srcabl_gateway::gateway::Gateway;
use srcabl_gateway::model::Identity;
use srcabl_gateway::services::{
    ContentService, CreateIdentity, FollowEdge, IdentityService, LinkRecord, NewPost, PostRecord,
    ProvenanceService, SourceNode, UserRecord, ValidateBy, ValidateCredentials,
};
use srcabl_gateway::session::{IdentityContext, RequestContext, SessionStore};
use srcabl_gateway::types::{GatewayError, Result, UpstreamKind};

pub type Journal = Arc<Mutex<Vec<String>>>;

fn note(journal: &Journal, entry: &str) {
    journal.lock().unwrap().push(entry.to_string());
}

fn rejected(service: &'static str, operation: &'static str, message: &str) -> GatewayError {
    GatewayError::upstream(service, operation, UpstreamKind::Rejected, message)
}

// =============================================================================
// Identity
// =============================================================================

pub struct MockIdentity {
    journal: Journal,
    pub accounts: Mutex<Vec<(UserRecord, String)>>,
    pub created: Mutex<Vec<CreateIdentity>>,
    pub validations: Mutex<Vec<ValidateCredentials>>,
    pub edges: Mutex<Vec<FollowEdge>>,
    pub fail_create: AtomicBool,
    /// Refuse follow and unfollow
    pub fail_follow: AtomicBool,
    /// Hand out 3-byte ids instead of 16
    pub malformed_ids: AtomicBool,
}

impl MockIdentity {
    fn new(journal: Journal) -> Self {
        Self {
            journal,
            accounts: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            validations: Mutex::new(Vec::new()),
            edges: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_follow: AtomicBool::new(false),
            malformed_ids: AtomicBool::new(false),
        }
    }

    /// Seed an account that `validate_credentials` will accept
    pub fn add_account(&self, username: &str, email: &str, password: &str) -> Identity {
        let id = Identity::new_random();
        let record = UserRecord {
            uuid: id.to_vec(),
            username: username.to_string(),
            email: email.to_string(),
        };
        self.accounts
            .lock()
            .unwrap()
            .push((record, password.to_string()));
        id
    }

    fn next_id(&self) -> Vec<u8> {
        if self.malformed_ids.load(Ordering::SeqCst) {
            vec![1, 2, 3]
        } else {
            Identity::new_random().to_vec()
        }
    }
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn create_identity(&self, _ctx: &RequestContext, input: CreateIdentity) -> Result<UserRecord> {
        note(&self.journal, "identity.create_identity");
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(rejected("identity", "CreateUser", "username taken"));
        }

        let record = UserRecord {
            uuid: self.next_id(),
            username: input.username.clone(),
            email: input.email.clone(),
        };
        self.created.lock().unwrap().push(input);
        Ok(record)
    }

    async fn get_identity(&self, _ctx: &RequestContext, id: &Identity) -> Result<Option<UserRecord>> {
        note(&self.journal, "identity.get_identity");
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(user, _)| user.uuid == id.to_vec())
            .map(|(user, _)| user.clone()))
    }

    async fn validate_credentials(
        &self,
        _ctx: &RequestContext,
        input: ValidateCredentials,
    ) -> Result<UserRecord> {
        note(&self.journal, "identity.validate_credentials");
        self.validations.lock().unwrap().push(input.clone());

        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(user, password)| {
                let key_matches = match input.validate_by {
                    ValidateBy::Username => user.username == input.username,
                    ValidateBy::Email => user.email == input.email,
                };
                key_matches && *password == input.password
            })
            .map(|(user, _)| user.clone())
            .ok_or_else(|| rejected("identity", "ValidateUserCredentials", "invalid credentials"))
    }

    async fn follow(&self, _ctx: &RequestContext, edge: FollowEdge) -> Result<()> {
        note(&self.journal, "identity.follow");
        if self.fail_follow.load(Ordering::SeqCst) {
            return Err(rejected("identity", "Follow", "graph store unavailable"));
        }
        let mut edges = self.edges.lock().unwrap();
        if !edges.contains(&edge) {
            edges.push(edge);
        }
        Ok(())
    }

    async fn unfollow(&self, _ctx: &RequestContext, edge: FollowEdge) -> Result<()> {
        note(&self.journal, "identity.unfollow");
        if self.fail_follow.load(Ordering::SeqCst) {
            return Err(rejected("identity", "UnFollow", "graph store unavailable"));
        }
        self.edges.lock().unwrap().retain(|e| *e != edge);
        Ok(())
    }
}

// =============================================================================
// Content
// =============================================================================

pub struct MockContent {
    journal: Journal,
    pub links: Mutex<HashMap<String, LinkRecord>>,
    pub created_links: Mutex<Vec<LinkRecord>>,
    pub posts: Mutex<Vec<PostRecord>>,
    pub new_posts: Mutex<Vec<NewPost>>,
    /// Refuse a second link for the same URL with a conflict
    pub enforce_unique_urls: AtomicBool,
    pub fail_get_link: AtomicBool,
    pub fail_create_link: AtomicBool,
    pub fail_create_post: AtomicBool,
    pub fail_list: AtomicBool,
    /// Park `list_user_posts` after signalling `list_entered` until
    /// `list_release` is notified
    pub hold_list: AtomicBool,
    pub list_entered: Notify,
    pub list_release: Notify,
    /// Make the first `get_link` callers wait for each other after reading
    race: Option<(Barrier, AtomicUsize, usize)>,
}

impl MockContent {
    fn new(journal: Journal) -> Self {
        Self {
            journal,
            links: Mutex::new(HashMap::new()),
            created_links: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            new_posts: Mutex::new(Vec::new()),
            enforce_unique_urls: AtomicBool::new(true),
            fail_get_link: AtomicBool::new(false),
            fail_create_link: AtomicBool::new(false),
            fail_create_post: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            hold_list: AtomicBool::new(false),
            list_entered: Notify::new(),
            list_release: Notify::new(),
            race: None,
        }
    }

    /// Seed a link for `url`
    pub fn add_link(&self, url: &str) -> LinkRecord {
        let link = LinkRecord {
            uuid: Identity::new_random().to_vec(),
            url: url.to_string(),
            source_head_uuids: vec![],
        };
        self.links
            .lock()
            .unwrap()
            .insert(url.to_string(), link.clone());
        link
    }

    pub fn add_post(&self, post: PostRecord, link: LinkRecord) {
        self.links.lock().unwrap().insert(link.url.clone(), link);
        self.posts.lock().unwrap().push(post);
    }
}

#[async_trait]
impl ContentService for MockContent {
    async fn get_link(&self, _ctx: &RequestContext, url: &str) -> Result<Option<LinkRecord>> {
        note(&self.journal, "content.get_link");
        if self.fail_get_link.load(Ordering::SeqCst) {
            return Err(GatewayError::upstream(
                "content",
                "GetLink",
                UpstreamKind::Unavailable,
                "connection refused",
            ));
        }

        let found = self.links.lock().unwrap().get(url).cloned();

        if let Some((barrier, arrivals, parties)) = &self.race {
            if arrivals.fetch_add(1, Ordering::SeqCst) < *parties {
                barrier.wait().await;
            }
        }
        Ok(found)
    }

    async fn create_link(
        &self,
        _ctx: &RequestContext,
        url: &str,
        source_head_uuids: Vec<Vec<u8>>,
    ) -> Result<LinkRecord> {
        note(&self.journal, "content.create_link");
        if self.fail_create_link.load(Ordering::SeqCst) {
            return Err(rejected("content", "CreateLink", "link store unavailable"));
        }

        let mut links = self.links.lock().unwrap();
        if self.enforce_unique_urls.load(Ordering::SeqCst) && links.contains_key(url) {
            return Err(GatewayError::upstream(
                "content",
                "CreateLink",
                UpstreamKind::Conflict,
                "link already exists",
            ));
        }

        let link = LinkRecord {
            uuid: Identity::new_random().to_vec(),
            url: url.to_string(),
            source_head_uuids,
        };
        links.insert(url.to_string(), link.clone());
        self.created_links.lock().unwrap().push(link.clone());
        Ok(link)
    }

    async fn create_post(&self, _ctx: &RequestContext, post: NewPost) -> Result<PostRecord> {
        note(&self.journal, "content.create_post");
        if self.fail_create_post.load(Ordering::SeqCst) {
            return Err(rejected("content", "CreatePost", "post store unavailable"));
        }
        let record = PostRecord {
            uuid: Identity::new_random().to_vec(),
            user_uuid: post.author.to_vec(),
            link_uuid: post.link_uuid.clone(),
            title: post.title.clone(),
            comment: post.comment.clone(),
        };
        self.posts.lock().unwrap().push(record.clone());
        self.new_posts.lock().unwrap().push(post);
        Ok(record)
    }

    async fn list_user_posts(
        &self,
        _ctx: &RequestContext,
        author: &Identity,
    ) -> Result<Vec<(PostRecord, LinkRecord)>> {
        note(&self.journal, "content.list_user_posts");
        if self.hold_list.load(Ordering::SeqCst) {
            self.list_entered.notify_one();
            self.list_release.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(rejected("content", "ListUsersPosts", "index offline"));
        }

        let links = self.links.lock().unwrap();
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| post.user_uuid == author.to_vec())
            .filter_map(|post| {
                links
                    .values()
                    .find(|link| link.uuid == post.link_uuid)
                    .map(|link| (post.clone(), link.clone()))
            })
            .collect())
    }
}

// =============================================================================
// Provenance
// =============================================================================

pub struct MockProvenance {
    journal: Journal,
    pub fail: AtomicBool,
    pub sources: Vec<SourceNode>,
}

impl MockProvenance {
    fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: AtomicBool::new(false),
            sources: vec![SourceNode {
                uuid: Identity::new_random().to_vec(),
                name: "Example Wire".into(),
            }],
        }
    }
}

#[async_trait]
impl ProvenanceService for MockProvenance {
    async fn determine_source(&self, _ctx: &RequestContext, _url: &str) -> Result<Vec<SourceNode>> {
        note(&self.journal, "provenance.determine_source");
        if self.fail.load(Ordering::SeqCst) {
            return Err(rejected("provenance", "DetermineLinkSource", "cannot classify url"));
        }
        Ok(self.sources.clone())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub journal: Journal,
    pub identity: Arc<MockIdentity>,
    pub content: Arc<MockContent>,
    pub provenance: Arc<MockProvenance>,
    pub gateway: Arc<Gateway>,
    pub sessions: Arc<SessionStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// The first `parties` link lookups block until all of them have read
    pub fn racing(parties: usize) -> Self {
        Self::build(Some(parties))
    }

    fn build(race_parties: Option<usize>) -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));

        let identity = Arc::new(MockIdentity::new(Arc::clone(&journal)));
        let mut content = MockContent::new(Arc::clone(&journal));
        content.race = race_parties.map(|n| (Barrier::new(n), AtomicUsize::new(0), n));
        let content = Arc::new(content);
        let provenance = Arc::new(MockProvenance::new(Arc::clone(&journal)));

        let gateway = Arc::new(Gateway::new(
            identity.clone(),
            content.clone(),
            provenance.clone(),
        ));

        Self {
            journal,
            identity,
            content,
            provenance,
            gateway,
            sessions: Arc::new(SessionStore::default()),
        }
    }

    /// A request from a fresh, anonymous session
    pub fn anonymous(&self) -> RequestContext {
        let session_id = self.sessions.create();
        RequestContext::new(IdentityContext::new(Arc::clone(&self.sessions), session_id))
    }

    /// A request from a session already signed in as a new identity
    pub fn signed_in(&self) -> (RequestContext, Identity) {
        let ctx = self.anonymous();
        let id = Identity::new_random();
        ctx.identity.set(Some(id));
        (ctx, id)
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == entry)
            .count()
    }
}
