//! Writer for replay streams.

use crate::format::{
    self, encode_event, encode_mc_shower, encode_run_header, FormatError, TAG_EVENT,
    TAG_MC_SHOWER, TAG_RUN_HEADER,
};
use crate::records::{EventRecord, RunHeader};
use crate::types::McShower;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Buffered replay stream writer.
///
/// Blocks are written in call order; the caller is responsible for putting a run header
/// before the events of that run.
pub struct ReplayWriter<W: Write> {
    writer: BufWriter<W>,
    blocks: u64,
}

impl ReplayWriter<File> {
    /// Creates `path` and writes the stream header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let file = File::create(path.as_ref())?;
        let mut writer = Self::new(file);
        writer.write_header()?;
        Ok(writer)
    }
}

impl<W: Write> ReplayWriter<W> {
    /// Wraps `writer`. No header is written.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            blocks: 0,
        }
    }

    /// Writes the stream header.
    pub fn write_header(&mut self) -> Result<(), FormatError> {
        format::write_header(&mut self.writer)
    }

    /// Starts a run.
    pub fn write_run_header(&mut self, run: &RunHeader) -> Result<(), FormatError> {
        let payload = encode_run_header(run)?;
        self.write_block(TAG_RUN_HEADER, &payload)
    }

    /// Attaches simulated shower parameters to the next event.
    pub fn write_mc_shower(&mut self, shower: &McShower) -> Result<(), FormatError> {
        let payload = encode_mc_shower(shower)?;
        self.write_block(TAG_MC_SHOWER, &payload)
    }

    /// Appends an event. An event whose ADC or timing arrays disagree with their declared
    /// shape is rejected with [`FormatError::Malformed`] and nothing is written.
    pub fn write_event(&mut self, event: &EventRecord) -> Result<(), FormatError> {
        let payload = encode_event(event)?;
        self.write_block(TAG_EVENT, &payload)
    }

    /// Writes a raw block. Readers skip tags they do not know.
    pub fn write_block(&mut self, tag: u32, payload: &[u8]) -> Result<(), FormatError> {
        format::write_block(&mut self.writer, tag, payload)?;
        self.blocks += 1;
        Ok(())
    }

    /// Number of blocks written so far.
    pub fn blocks_written(&self) -> u64 {
        self.blocks
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), FormatError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(self) -> Result<W, FormatError> {
        self.writer
            .into_inner()
            .map_err(|e| FormatError::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{decode_event, read_block, read_header, MAGIC};
    use crate::records::{AdcData, TelescopeConfig, TelescopeEvent};

    #[test]
    fn test_writer_emits_header_and_blocks() {
        let mut writer = ReplayWriter::new(Vec::new());
        writer.write_header().unwrap();
        writer
            .write_run_header(&RunHeader::new(7, vec![TelescopeConfig::new(1, 3)]))
            .unwrap();
        writer.write_event(&EventRecord::new(0)).unwrap();
        assert_eq!(writer.blocks_written(), 2);

        let bytes = writer.into_inner().unwrap();
        assert_eq!(&bytes[..8], &MAGIC);

        let mut reader = bytes.as_slice();
        read_header(&mut reader).unwrap();
        let first = read_block(&mut reader, u32::MAX).unwrap().unwrap();
        let second = read_block(&mut reader, u32::MAX).unwrap().unwrap();
        assert_eq!(first.tag, TAG_RUN_HEADER);
        assert_eq!(second.tag, TAG_EVENT);
        assert!(read_block(&mut reader, u32::MAX).unwrap().is_none());
    }

    #[test]
    fn test_rejected_event_leaves_stream_readable() {
        let mut writer = ReplayWriter::new(Vec::new());
        writer.write_header().unwrap();
        writer
            .write_run_header(&RunHeader::new(7, vec![TelescopeConfig::new(1, 2)]))
            .unwrap();

        let mut bad = EventRecord::new(5);
        let mut tel = TelescopeEvent::new(1);
        tel.raw = Some(AdcData {
            num_gains: 1,
            num_pixels: 2,
            num_samples: 3,
            samples: vec![1; 4],
            sums: vec![3, 1],
        });
        bad.telescopes.push(tel);
        assert!(matches!(
            writer.write_event(&bad),
            Err(FormatError::Malformed(_))
        ));
        assert_eq!(writer.blocks_written(), 1);

        writer.write_event(&EventRecord::new(6)).unwrap();
        let bytes = writer.into_inner().unwrap();
        let mut reader = bytes.as_slice();
        read_header(&mut reader).unwrap();
        assert_eq!(
            read_block(&mut reader, u32::MAX).unwrap().unwrap().tag,
            TAG_RUN_HEADER
        );
        let event = read_block(&mut reader, u32::MAX).unwrap().unwrap();
        assert_eq!(event.tag, TAG_EVENT);
        assert_eq!(decode_event(&event.payload).unwrap().global_count, 6);
        assert!(read_block(&mut reader, u32::MAX).unwrap().is_none());
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.replay");
        let mut writer = ReplayWriter::create(&path).unwrap();
        writer.write_mc_shower(&McShower::default()).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let bytes = std::fs::read(&path).unwrap();
        // header (12) + block header (8) + shower payload (44)
        assert_eq!(bytes.len(), 12 + 8 + 44);
    }
}
