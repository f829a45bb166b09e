use std::path::Path;

use ihex::{Reader, Record};
use sbl_port::{SimpleRead, SimpleWrite};
use sbl_protocol::Width;

use crate::{Result, client::Client};

/// Contiguous bytes to be placed at `addr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub addr: u32,
    pub data: Vec<u8>,
}

impl Segment {
    fn end(&self) -> u32 {
        self.addr.wrapping_add(self.data.len() as u32)
    }
}

/// Memory image to upload, with the entry point if the file names one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub segments: Vec<Segment>,
    pub entry: Option<u32>,
}

impl Image {
    pub fn binary(addr: u32, data: Vec<u8>) -> Self {
        Self {
            segments: vec![Segment { addr, data }],
            entry: None,
        }
    }

    /// Parse Intel HEX text. Adjacent data records are merged into one segment.
    pub fn from_ihex(text: &str) -> Result<Self> {
        let mut image = Self::default();
        let mut upper = 0u32;

        for record in Reader::new(text) {
            match record? {
                Record::Data { offset, value } => image.push(upper.wrapping_add(offset as u32), value),
                Record::ExtendedSegmentAddress(segment) => upper = (segment as u32) << 4,
                Record::ExtendedLinearAddress(high) => upper = (high as u32) << 16,
                Record::StartSegmentAddress { cs, ip } => {
                    image.entry = Some(((cs as u32) << 4).wrapping_add(ip as u32))
                }
                Record::StartLinearAddress(eip) => image.entry = Some(eip),
                Record::EndOfFile => break,
            }
        }

        Ok(image)
    }

    pub fn size(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }

    fn push(&mut self, addr: u32, data: Vec<u8>) {
        match self.segments.last_mut() {
            Some(last) if last.end() == addr => last.data.extend(data),
            _ => self.segments.push(Segment { addr, data }),
        }
    }
}

pub fn is_ihex(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hex") || ext.eq_ignore_ascii_case("ihex"))
}

/// Write every segment of `image`, reading each one back if `verify` is set.
pub fn upload<T: SimpleRead + SimpleWrite>(
    client: &mut Client<T>,
    image: &Image,
    verify: bool,
    width: Width,
    chunk: usize,
) -> Result<()> {
    for segment in &image.segments {
        client.write(segment.addr, &segment.data, width, chunk)?;
        if verify {
            client.verify(segment.addr, &segment.data, width, chunk)?;
        }
    }

    Ok(())
}
