use async_trait::async_trait;
use backup_rotator_backends::{Backend, BackendType, CopyOutcome};
use backup_rotator_core::Result;
use bytes::Bytes;
use std::sync::Mutex;

/// In-memory backend that records copy and delete calls.
#[derive(Default)]
pub struct MockBackend {
    modifiers: Mutex<Vec<String>>,
    copies: Mutex<Vec<(String, bool)>>,
    deletions: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn with_modifiers(modifiers: &[&str]) -> Self {
        Self {
            modifiers: Mutex::new(modifiers.iter().map(|m| m.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn modifiers(&self) -> Vec<String> {
        self.modifiers.lock().unwrap().clone()
    }

    pub fn copies(&self) -> Vec<(String, bool)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn deletions(&self) -> Vec<String> {
        self.deletions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn on_chunk(&mut self, _chunk: Bytes, _index: u64) -> Result<()> {
        Ok(())
    }

    async fn on_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn existing_copy_modifiers(&self) -> Result<Vec<String>> {
        Ok(self.modifiers())
    }

    async fn copy_with_modifier(&self, modifier: &str, allow_overwrite: bool) -> Result<CopyOutcome> {
        self.copies
            .lock()
            .unwrap()
            .push((modifier.to_string(), allow_overwrite));
        let mut modifiers = self.modifiers.lock().unwrap();
        if modifiers.iter().any(|m| m == modifier) {
            return Ok(if allow_overwrite {
                CopyOutcome::Overwritten
            } else {
                CopyOutcome::Skipped
            });
        }
        modifiers.push(modifier.to_string());
        Ok(CopyOutcome::Created)
    }

    async fn delete_with_modifier(&self, modifier: &str) -> Result<()> {
        self.deletions.lock().unwrap().push(modifier.to_string());
        self.modifiers.lock().unwrap().retain(|m| m != modifier);
        Ok(())
    }

    fn storage_key(&self) -> String {
        "memory://backup.tar.gz".to_string()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::File
    }
}
