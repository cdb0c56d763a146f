/* User-storage notepad pages. */
use tracing::warn;

use crate::engine::Driver;
use crate::error::{DriverError, Result};
use crate::protocol::{Command, NOTEPAD_COUNT, NOTEPAD_SIZE};

impl Driver {
    /// Read the contents of notepad `page` (0..NOTEPAD_COUNT).
    pub async fn notepad_get(&self, page: u8) -> Result<[u8; NOTEPAD_SIZE]> {
        self.check_page(page)?;
        let _lock = self.serialize_commands().await;
        let (ack, _) = self.command_get(Command::NotepadGet.opcode(), &[page], false).await?;
        let data = &ack.payload[1..];
        if data.len() != NOTEPAD_SIZE {
            return Err(DriverError::Argument(format!(
                "notepad page came back as {} bytes, expected {NOTEPAD_SIZE}",
                data.len()
            )));
        }
        let mut page_bytes = [0u8; NOTEPAD_SIZE];
        page_bytes.copy_from_slice(data);
        Ok(page_bytes)
    }

    /// Write `data` to notepad `page`, cropping anything past `NOTEPAD_SIZE`.
    pub async fn notepad_set(&self, page: u8, data: &[u8]) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.notepad_set_unlocked(page, data).await
    }

    /// Zero out notepad `page`.
    pub async fn notepad_clear(&self, page: u8) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.notepad_set_unlocked(page, &[0u8; NOTEPAD_SIZE]).await
    }

    /// Same as `notepad_set`, without acquiring the command lock. Only for
    /// callers that already hold it (`notepad_clear`).
    async fn notepad_set_unlocked(&self, page: u8, data: &[u8]) -> Result<()> {
        self.check_page(page)?;
        let data = if data.len() > NOTEPAD_SIZE {
            warn!(len = data.len(), "cropping notepad write to fit the page size");
            &data[..NOTEPAD_SIZE]
        } else {
            data
        };
        let mut payload = vec![page];
        payload.extend_from_slice(data);
        self.command_set(Command::NotepadSet.opcode(), &payload, &[]).await
    }

    fn check_page(&self, page: u8) -> Result<()> {
        if page >= NOTEPAD_COUNT {
            return Err(DriverError::Argument(format!("notepad page {page} out of range 0..{NOTEPAD_COUNT}")));
        }
        Ok(())
    }
}
