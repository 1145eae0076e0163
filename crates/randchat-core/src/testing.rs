//! In-memory fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use randchat_types::config::GlobalConfig;
use randchat_types::error::{DeliveryError, RepositoryError};
use randchat_types::invitation::Invitation;
use randchat_types::message::ChatMessage;
use randchat_types::sex::Sex;
use randchat_types::talk::Talk;
use randchat_types::user::{ChatState, User, UserId};

use crate::directory::{Directory, UserHandle};
use crate::gateway::Gateway;
use crate::i18n::Localizer;
use crate::lifecycle::Lifecycle;
use crate::locks::CandidateLocks;
use crate::matcher::{MatchPolicy, Matcher};
use crate::pairing::PairingCoordinator;
use crate::repository::talk::TalkRepository;
use crate::repository::user::{UserRepository, UserStats, WaitingFilter};
use crate::transport::ChatTransport;

/// A fresh user with `configure` applied.
pub fn user_with(id: i64, configure: impl FnOnce(&mut User)) -> User {
    let mut user = User::new(UserId(id), Invitation::generate());
    configure(&mut user);
    user
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<UserId, User>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryUsers {
    /// Store `user` directly, bypassing the directory.
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn stored(&self, id: UserId) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl UserRepository for InMemoryUsers {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("user {}", user.id)));
        }
        if users.values().any(|u| u.invitation == user.invitation) {
            return Err(RepositoryError::Conflict("invitation".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.stored(id))
    }

    async fn get_by_invitation(
        &self,
        invitation: &Invitation,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| &u.invitation == invitation).cloned())
    }

    async fn query_waiting(&self, filter: &WaitingFilter) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.lock().unwrap();
        let mut waiting: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();
        waiting.sort_by(|a, b| {
            b.bonus_count
                .cmp(&a.bonus_count)
                .then(a.looking_for_partner_from().cmp(&b.looking_for_partner_from()))
        });
        Ok(waiting)
    }

    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn stats(&self) -> Result<UserStats, RepositoryError> {
        let users = self.users.lock().unwrap();
        let mut stats = UserStats {
            total: users.len() as u64,
            ..UserStats::default()
        };
        for user in users.values() {
            match user.state {
                ChatState::Idle => {}
                ChatState::Waiting { .. } => stats.waiting += 1,
                ChatState::Chatting { .. } => stats.chatting += 1,
            }
            if user.is_full() {
                stats.full_profiles += 1;
            }
        }
        Ok(stats)
    }
}

/// Talk history kept in insertion order.
#[derive(Default)]
pub struct InMemoryTalks {
    talks: Mutex<Vec<Talk>>,
}

impl InMemoryTalks {
    pub fn insert(&self, talk: Talk) {
        self.talks.lock().unwrap().push(talk);
    }

    pub fn open_talks(&self) -> usize {
        self.talks.lock().unwrap().iter().filter(|t| !t.is_finished()).count()
    }
}

impl TalkRepository for InMemoryTalks {
    async fn record_talk(&self, talk: &Talk) -> Result<(), RepositoryError> {
        self.insert(talk.clone());
        Ok(())
    }

    async fn finish_talk(&self, user: UserId, end: DateTime<Utc>) -> Result<(), RepositoryError> {
        for talk in self.talks.lock().unwrap().iter_mut() {
            if talk.involves(user) && talk.end.is_none() {
                talk.end = Some(end);
            }
        }
        Ok(())
    }

    async fn recent_partner_ids(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let talks = self.talks.lock().unwrap();
        Ok(talks
            .iter()
            .rev()
            .filter_map(|t| t.partner_of(user))
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.talks.lock().unwrap().len() as u64)
    }
}

/// A search that ends while a notification to `trigger` is in flight.
struct Interruption {
    trigger: UserId,
    directory: Arc<Directory<InMemoryUsers>>,
    leaver: Arc<UserHandle>,
}

/// Records every delivery; selected users or content kinds can be made to fail.
#[derive(Default)]
pub struct RecordingTransport {
    notes: Mutex<Vec<(UserId, String)>>,
    relays: Mutex<Vec<(UserId, ChatMessage)>>,
    unreachable: Mutex<HashSet<UserId>>,
    unsupported: Mutex<HashSet<String>>,
    interruption: Mutex<Option<Interruption>>,
}

impl RecordingTransport {
    /// Once, while notifying `trigger`, move `leaver` out of the waiting pool.
    pub fn stop_waiting_on_notify(
        &self,
        trigger: UserId,
        directory: Arc<Directory<InMemoryUsers>>,
        leaver: Arc<UserHandle>,
    ) {
        *self.interruption.lock().unwrap() = Some(Interruption {
            trigger,
            directory,
            leaver,
        });
    }

    pub fn set_unreachable(&self, user: UserId) {
        self.unreachable.lock().unwrap().insert(user);
    }

    pub fn set_unsupported(&self, kind: &str) {
        self.unsupported.lock().unwrap().insert(kind.to_string());
    }

    pub fn notes_for(&self, user: UserId) -> Vec<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Recipients of notifications, in delivery order.
    pub fn recipients(&self) -> Vec<UserId> {
        self.notes.lock().unwrap().iter().map(|(to, _)| *to).collect()
    }

    pub fn relayed_to(&self, user: UserId) -> Vec<ChatMessage> {
        self.relays
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notes.lock().unwrap().clear();
        self.relays.lock().unwrap().clear();
    }

    fn check_reachable(&self, user: UserId) -> Result<(), DeliveryError> {
        if self.unreachable.lock().unwrap().contains(&user) {
            return Err(DeliveryError::Unreachable(format!("user {user} blocked the bot")));
        }
        Ok(())
    }
}

impl ChatTransport for RecordingTransport {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        self.check_reachable(user)?;
        self.notes.lock().unwrap().push((user, text.to_string()));

        let interruption = {
            let mut slot = self.interruption.lock().unwrap();
            if slot.as_ref().is_some_and(|i| i.trigger == user) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(i) = interruption {
            i.directory
                .update(&i.leaver, |record| {
                    record.state = ChatState::Idle;
                    Ok(())
                })
                .await
                .unwrap();
        }
        Ok(())
    }

    async fn relay(&self, user: UserId, message: &ChatMessage) -> Result<(), DeliveryError> {
        self.check_reachable(user)?;
        if self.unsupported.lock().unwrap().contains(message.kind()) {
            return Err(DeliveryError::Unsupported(message.kind().to_string()));
        }
        self.relays.lock().unwrap().push((user, message.clone()));
        Ok(())
    }
}

/// English templates with a couple of Russian sex answers.
#[derive(Default)]
pub struct TestLocalizer;

impl Localizer for TestLocalizer {
    fn translate(&self, _locale: &str, text: &str) -> String {
        text.to_string()
    }

    fn language_names(&self, _locale: &str, codes: &[String]) -> Vec<String> {
        codes.to_vec()
    }

    fn sex_synonyms(&self, locale: &str) -> Vec<(String, Sex)> {
        match locale {
            "ru" => vec![
                ("мужской".to_string(), Sex::Male),
                ("женский".to_string(), Sex::Female),
            ],
            _ => Vec::new(),
        }
    }

    fn supported_locales(&self) -> Vec<String> {
        vec!["en".to_string(), "ru".to_string()]
    }
}

pub type TestLifecycle = Lifecycle<InMemoryUsers, InMemoryTalks, RecordingTransport>;

/// The core wired to in-memory fakes.
pub struct Rig {
    pub users: Arc<InMemoryUsers>,
    pub talks: Arc<InMemoryTalks>,
    pub transport: Arc<RecordingTransport>,
    pub locks: Arc<CandidateLocks>,
    pub lifecycle: Arc<TestLifecycle>,
}

impl Rig {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let talks = Arc::new(InMemoryTalks::default());
        let transport = Arc::new(RecordingTransport::default());
        let lifecycle = Arc::new(Lifecycle::new(
            Arc::new(Directory::new(users.clone())),
            talks.clone(),
            transport.clone(),
            Arc::new(TestLocalizer),
            Arc::new(GlobalConfig::default()),
        ));
        Self {
            users,
            talks,
            transport,
            locks: CandidateLocks::new(),
            lifecycle,
        }
    }

    /// Store `user` and return its live handle.
    pub async fn insert(&self, user: User) -> Arc<UserHandle> {
        let id = user.id;
        self.users.insert(user);
        self.lifecycle.directory().get(id).await.unwrap().unwrap()
    }

    /// The live handle for `id`, created on first use.
    pub async fn user(&self, id: i64) -> Arc<UserHandle> {
        self.lifecycle.directory().get_or_create(UserId(id)).await.unwrap()
    }

    /// Two English speakers already chatting, with an open talk.
    pub async fn chatting_pair(&self, a: i64, b: i64) -> (Arc<UserHandle>, Arc<UserHandle>) {
        let pair = |id: i64, partner: i64| {
            user_with(id, |u| {
                u.languages = randchat_types::language::Languages::new(["en"]).unwrap();
                u.state = ChatState::Chatting { partner: UserId(partner) };
            })
        };
        let first = self.insert(pair(a, b)).await;
        let second = self.insert(pair(b, a)).await;
        self.talks.insert(Talk::new(UserId(a), UserId(b), None));
        (first, second)
    }

    pub fn matcher(&self) -> Matcher<InMemoryUsers, InMemoryTalks> {
        Matcher::new(
            self.lifecycle.directory().clone(),
            self.talks.clone(),
            self.locks.clone(),
            MatchPolicy::from(self.lifecycle.config()),
        )
    }

    pub fn coordinator(&self) -> PairingCoordinator<InMemoryUsers, InMemoryTalks, RecordingTransport> {
        PairingCoordinator::new(self.lifecycle.clone(), self.locks.clone())
    }

    pub fn gateway(&self) -> Gateway<InMemoryUsers, InMemoryTalks, RecordingTransport> {
        Gateway::new(self.lifecycle.clone(), self.locks.clone())
    }
}
