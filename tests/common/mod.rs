//! Shared fakes: a scripted control transport and an in-memory config store
//! that write into one event log, so tests can check ordering across both.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use onion_keeper::crypto;
use onion_keeper::service::{Keygen, OnionServiceManager};
use onion_keeper::state::{
    ClientAuthKeypair, KeyType, OnionConfigProvider, OnionIdentity, OnionServiceDesiredConfig,
    ProvisionRecord,
};
use onion_keeper::tor::{ControlError, ControlReply, ControlTransport};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub type EventLog = Arc<Mutex<Vec<String>>>;

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Answers like a Tor that has just restarted and knows nothing
pub fn fresh_tor_reply(cmd: &str) -> String {
    if cmd.starts_with("ADD_ONION NEW:") {
        "250-ServiceID=abc123\r\n250-PrivateKey=ED25519-V3:KEYBLOB\r\n250 OK\r\n".to_string()
    } else if cmd.starts_with("ADD_ONION ") {
        "250-ServiceID=xyz789\r\n250 OK\r\n".to_string()
    } else if cmd.starts_with("DEL_ONION ") {
        "552 Unknown Onion Service id\r\n".to_string()
    } else if cmd.starts_with("ONION_CLIENT_AUTH_REMOVE ") {
        "551 Failed to remove client\r\n".to_string()
    } else if cmd.starts_with("ONION_CLIENT_AUTH_ADD ") || cmd == "SIGNAL NEWNYM" {
        "250 OK\r\n".to_string()
    } else {
        "510 Unrecognized command\r\n".to_string()
    }
}

pub struct ScriptedTor {
    log: EventLog,
    responder: Responder,
}

impl ScriptedTor {
    pub fn new(log: EventLog) -> Self {
        Self::with(log, fresh_tor_reply)
    }

    pub fn with<F>(log: EventLog, responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            log,
            responder: Box::new(responder),
        }
    }
}

#[async_trait]
impl ControlTransport for ScriptedTor {
    async fn send_command(&self, command: &str) -> Result<ControlReply, ControlError> {
        self.log.lock().unwrap().push(command.to_string());
        ControlReply::parse(&(self.responder)(command))
    }
}

pub struct MemoryStore {
    log: EventLog,
    config: Mutex<OnionServiceDesiredConfig>,
    pub saved: Mutex<Vec<ProvisionRecord>>,
    pub fail_save: bool,
}

impl MemoryStore {
    pub fn new(log: EventLog, config: OnionServiceDesiredConfig) -> Self {
        Self {
            log,
            config: Mutex::new(config),
            saved: Mutex::new(Vec::new()),
            fail_save: false,
        }
    }
}

impl OnionConfigProvider for MemoryStore {
    fn load(&self) -> Result<OnionServiceDesiredConfig> {
        Ok(self.config.lock().unwrap().clone())
    }

    fn save(&self, record: &ProvisionRecord) -> Result<()> {
        if self.fail_save {
            bail!("disk full");
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("SAVE {}", record.identity.public_address));
        self.saved.lock().unwrap().push(record.clone());
        self.config.lock().unwrap().existing = Some(record.identity.clone());
        Ok(())
    }
}

pub fn empty_config() -> OnionServiceDesiredConfig {
    OnionServiceDesiredConfig {
        onion_port: 80,
        map_to_host_and_port: "127.0.0.1:8080".to_string(),
        existing: None,
        client_auth_public_keys: Vec::new(),
        remote_client_auth: BTreeMap::new(),
    }
}

pub fn provisioned_config() -> OnionServiceDesiredConfig {
    let mut remote = BTreeMap::new();
    remote.insert("aaa111.onion".to_string(), "S0VZT05F".to_string());
    remote.insert("bbb222.onion".to_string(), "S0VZVFdP".to_string());

    OnionServiceDesiredConfig {
        existing: Some(OnionIdentity {
            key_type: KeyType::Ed25519V3,
            private_key: "KEYBLOB".to_string(),
            public_address: "xyz789.onion".to_string(),
        }),
        client_auth_public_keys: vec!["CLIENTONE".to_string(), "CLIENTTWO".to_string()],
        remote_client_auth: remote,
        ..empty_config()
    }
}

/// Commands a restore of [`provisioned_config`] must send, in order
pub fn expected_restore_commands() -> Vec<String> {
    vec![
        "DEL_ONION xyz789".to_string(),
        "ADD_ONION ED25519-V3:KEYBLOB Port=80,127.0.0.1:8080 Flags=Detach,V3Auth \
         ClientAuthV3=CLIENTONE ClientAuthV3=CLIENTTWO"
            .to_string(),
        "ONION_CLIENT_AUTH_REMOVE aaa111".to_string(),
        "ONION_CLIENT_AUTH_ADD aaa111 x25519:S0VZT05F".to_string(),
        "ONION_CLIENT_AUTH_REMOVE bbb222".to_string(),
        "ONION_CLIENT_AUTH_ADD bbb222 x25519:S0VZVFdP".to_string(),
    ]
}

/// Real keypair generation, recorded as `KEYGEN`
pub fn logging_keygen(log: EventLog) -> Keygen {
    Arc::new(move || {
        log.lock().unwrap().push("KEYGEN".to_string());
        crypto::generate_client_auth()
    })
}

/// Keygen that records the attempt and then fails
pub fn failing_keygen(log: EventLog) -> Keygen {
    Arc::new(move || -> Result<ClientAuthKeypair> {
        log.lock().unwrap().push("KEYGEN".to_string());
        bail!("entropy source unavailable")
    })
}

pub struct Harness {
    pub log: EventLog,
    pub store: Arc<MemoryStore>,
    pub manager: Arc<OnionServiceManager>,
}

impl Harness {
    pub fn new(config: OnionServiceDesiredConfig) -> Self {
        let log = EventLog::default();
        let store = Arc::new(MemoryStore::new(log.clone(), config));
        Self::assemble(log.clone(), store, ScriptedTor::new(log))
    }

    pub fn assemble(log: EventLog, store: Arc<MemoryStore>, tor: ScriptedTor) -> Self {
        let keygen = logging_keygen(log.clone());
        Self::assemble_with_keygen(log, store, tor, keygen)
    }

    pub fn assemble_with_keygen(
        log: EventLog,
        store: Arc<MemoryStore>,
        tor: ScriptedTor,
        keygen: Keygen,
    ) -> Self {
        let manager = Arc::new(
            OnionServiceManager::new(Arc::new(tor), store.clone()).with_keygen(keygen),
        );
        Self {
            log,
            store,
            manager,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}
