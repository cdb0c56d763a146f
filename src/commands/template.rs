/* Template lifecycle: create/store/load/upload/download/delete/empty/count/index,
 * 1:1 match, and 1:N search. */
use crate::engine::Driver;
use crate::error::{DriverError, Result};
use crate::protocol::{BufferId, Command, ErrorCode};

impl Driver {
    /// Merge the contents of char buffers 1 and 2 into one template, stored
    /// back into both buffers.
    pub async fn template_create(&self) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.command_set(Command::TemplateCreate.opcode(), &[], &[]).await
    }

    /// Store the template in `buffer` at database position `index`.
    pub async fn template_store(&self, buffer: BufferId, index: u16) -> Result<()> {
        self.check_index(index, 0)?;
        let mut payload = vec![buffer.id()];
        payload.extend_from_slice(&index.to_be_bytes());
        let _lock = self.serialize_commands().await;
        self.command_set(Command::TemplateStore.opcode(), &payload, &[]).await
    }

    /// Load the template at database position `index` into `buffer`.
    pub async fn template_load(&self, buffer: BufferId, index: u16) -> Result<()> {
        self.check_index(index, 0)?;
        let mut payload = vec![buffer.id()];
        payload.extend_from_slice(&index.to_be_bytes());
        let _lock = self.serialize_commands().await;
        self.command_set(Command::TemplateLoad.opcode(), &payload, &[]).await
    }

    /// Upload `data` into `buffer`'s char buffer and verify the sensor's copy
    /// matches by downloading it back. Holds the command lock across both the
    /// upload and the readback so no other operation can interleave between
    /// the two halves of the verification.
    pub async fn template_upload(&self, buffer: BufferId, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(DriverError::Argument("template data must not be empty".into()));
        }
        let _lock = self.serialize_commands().await;
        self.command_set(Command::TemplateUpload.opcode(), &[], data).await?;
        let echoed = self.template_download_unlocked(buffer).await?;
        if echoed != data {
            return Err(DriverError::Argument("uploaded template did not verify on readback".into()));
        }
        Ok(())
    }

    /// Download the contents of `buffer`'s char buffer.
    pub async fn template_download(&self, buffer: BufferId) -> Result<Vec<u8>> {
        let _lock = self.serialize_commands().await;
        self.template_download_unlocked(buffer).await
    }

    /// Same as `template_download`, without acquiring the command lock. Only
    /// for callers that already hold it (`template_upload`).
    async fn template_download_unlocked(&self, buffer: BufferId) -> Result<Vec<u8>> {
        let (_, data) = self.command_get(Command::TemplateDownload.opcode(), &[buffer.id()], true).await?;
        Ok(data)
    }

    /// Delete `count` templates starting at database position `index`.
    pub async fn template_delete(&self, index: u16, count: u16) -> Result<()> {
        self.check_index(index, count)?;
        let mut payload = index.to_be_bytes().to_vec();
        payload.extend_from_slice(&count.to_be_bytes());
        let _lock = self.serialize_commands().await;
        self.command_set(Command::TemplateDelete.opcode(), &payload, &[]).await
    }

    /// Delete every template from the device database.
    pub async fn template_empty(&self) -> Result<()> {
        let _lock = self.serialize_commands().await;
        self.command_set(Command::TemplateEmpty.opcode(), &[], &[]).await
    }

    /// Number of templates currently stored on the device.
    pub async fn template_count(&self) -> Result<u16> {
        let _lock = self.serialize_commands().await;
        let (ack, _) = self.command_get(Command::TemplateCount.opcode(), &[], false).await?;
        Ok(u16::from_be_bytes([ack.payload[1], ack.payload[2]]))
    }

    /// Bit vector over the device's database, `true` at every occupied index,
    /// truncated to the sensor's reported capacity.
    pub async fn template_index(&self) -> Result<Vec<bool>> {
        let _lock = self.serialize_commands().await;
        let capacity = self.capacity().await? as usize;
        let pages = capacity.div_ceil(256);

        let mut index = Vec::with_capacity(capacity);
        'pages: for page in 0..pages {
            let (ack, _) = self.command_get(Command::TemplateIndex.opcode(), &[page as u8], false).await?;
            for byte in &ack.payload[1..] {
                for bit in 0..8 {
                    index.push((byte & (1 << bit)) != 0);
                    if index.len() == capacity {
                        break 'pages;
                    }
                }
            }
        }
        Ok(index)
    }

    /// Compare the templates held in char buffers 1 and 2, returning the
    /// accuracy score.
    pub async fn template_match(&self) -> Result<u16> {
        let _lock = self.serialize_commands().await;
        let (ack, _) = self.command_get(Command::TemplateMatch.opcode(), &[], false).await?;
        Ok(u16::from_be_bytes([ack.payload[1], ack.payload[2]]))
    }

    /// Search the device database for the template in `buffer`, scanning
    /// `count` positions starting at `index`. Returns `(-1, _)` when the
    /// sensor reports no match rather than a transport error.
    pub async fn template_search(&self, buffer: BufferId, index: u16, count: u16, fast: bool) -> Result<(i32, u16)> {
        self.check_index(index, count)?;
        let command = if fast { Command::TemplateSearchFast } else { Command::TemplateSearch };

        let mut payload = vec![buffer.id()];
        payload.extend_from_slice(&index.to_be_bytes());
        payload.extend_from_slice(&count.to_be_bytes());

        let _lock = self.serialize_commands().await;
        match self.command_get(command.opcode(), &payload, false).await {
            Ok((ack, _)) => {
                let found = u16::from_be_bytes([ack.payload[1], ack.payload[2]]);
                let score = u16::from_be_bytes([ack.payload[3], ack.payload[4]]);
                Ok((found as i32, score))
            }
            Err(DriverError::Transaction(ErrorCode::FingerNotFound)) => Ok((-1, 0)),
            Err(err) => Err(err),
        }
    }

    /// Must only be called while the caller already holds the command lock
    /// (`template_index`).
    async fn capacity(&self) -> Result<u16> {
        match self.session().cached_capacity() {
            Some(capacity) => Ok(capacity),
            None => Ok(self.parameters_get_unlocked().await?.capacity),
        }
    }

    fn check_index(&self, index: u16, count: u16) -> Result<()> {
        let Some(capacity) = self.session().cached_capacity() else {
            // Capacity hasn't been queried yet; the sensor itself will reject
            // an out-of-range index, so there's nothing to validate locally.
            return Ok(());
        };
        if index >= capacity {
            return Err(DriverError::Argument(format!("index {index} exceeds device capacity {capacity}")));
        }
        if count > capacity - index {
            return Err(DriverError::Argument(format!(
                "selection {}..{} exceeds device capacity {capacity}",
                index,
                index as u32 + count as u32
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::protocol::{Frame, Pid};
    use tokio::sync::mpsc;

    struct RecordingPort {
        writes: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl crate::port::Port for RecordingPort {
        async fn read_until(&mut self, _delim: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn read_n(&mut self, _n: usize) -> std::io::Result<Option<Vec<u8>>> {
            std::future::pending().await
        }

        async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
            let _ = self.writes.send(buf.to_vec());
            Ok(())
        }

        async fn set_baud(&mut self, _baud: u32) -> std::io::Result<()> {
            Ok(())
        }

        fn cts(&mut self) -> bool {
            false
        }
    }

    fn connect() -> (Driver, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let port: Box<dyn crate::port::Port> = Box::new(RecordingPort { writes: tx });
        (Driver::connect(port, DriverConfig::default()), rx)
    }

    #[tokio::test]
    async fn template_store_rejects_index_past_cached_capacity() {
        let (driver, _writes) = connect();
        driver.session().set_capacity(100);

        let result = driver.template_store(BufferId::One, 100).await;
        assert!(matches!(result, Err(DriverError::Argument(_))));
    }

    #[tokio::test]
    async fn template_store_allows_any_index_before_capacity_is_known() {
        let (driver, mut writes) = connect();
        assert!(driver.session().cached_capacity().is_none());

        let handle = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.template_store(BufferId::One, 9_999).await })
        };
        writes.recv().await.expect("command frame written, no local rejection");
        let address = driver.session().address();
        driver.on_frame_received().emit(Frame::new(address, Pid::Ack, vec![ErrorCode::Success as u8]));

        handle.await.unwrap().expect("no cached capacity means nothing to validate locally");
    }

    #[tokio::test]
    async fn template_delete_rejects_a_selection_that_overruns_capacity() {
        let (driver, _writes) = connect();
        driver.session().set_capacity(10);

        let result = driver.template_delete(8, 5).await;
        assert!(matches!(result, Err(DriverError::Argument(_))));
    }

    #[tokio::test]
    async fn template_search_maps_finger_not_found_to_negative_one() {
        let (driver, mut writes) = connect();
        driver.session().set_capacity(10);

        let handle = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.template_search(BufferId::One, 0, 10, false).await })
        };
        writes.recv().await.expect("command frame written");
        let address = driver.session().address();
        driver.on_frame_received().emit(Frame::new(address, Pid::Ack, vec![ErrorCode::FingerNotFound as u8]));

        let (index, score) = handle.await.unwrap().expect("no-match maps to Ok((-1, 0))");
        assert_eq!((index, score), (-1, 0));
    }

    #[tokio::test]
    async fn template_index_assembles_bit_vector_lsb_first_truncated_to_capacity() {
        let (driver, mut writes) = connect();
        driver.session().set_capacity(10);

        let handle = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.template_index().await })
        };
        writes.recv().await.expect("template index request written");
        let address = driver.session().address();
        // Page byte 0b0000_0101 -> bits 0 and 2 occupied; only the first 10
        // bits of the page matter since capacity is 10.
        driver.on_frame_received().emit(Frame::new(address, Pid::Ack, vec![ErrorCode::Success as u8, 0b0000_0101]));

        let index = handle.await.unwrap().expect("single-page index assembles");
        assert_eq!(index.len(), 10);
        assert!(index[0]);
        assert!(!index[1]);
        assert!(index[2]);
        assert!(index[3..].iter().all(|&bit| !bit));
    }
}
