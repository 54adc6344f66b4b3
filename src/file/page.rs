use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use super::PageId;
use super::error::{FileError, FileResult};

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque token identifying one open page file.
///
/// Pages record the file they belong to with this token instead of a pointer,
/// so a page never keeps its file alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageFileId(u64);

impl PageFileId {
    pub(crate) fn next() -> Self {
        Self(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Bookkeeping every page carries: id, dirty flag and owning file.
///
/// Equality and hashing only look at the id.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    id: Option<PageId>,
    dirty: bool,
    owner: Option<PageFileId>,
}

impl PageMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a page that already has an id (used when decoding)
    pub fn with_id(id: PageId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<PageId> {
        self.id
    }

    /// Assign the id. Ids are set once; re-assigning the same value is a no-op.
    pub fn set_id(&mut self, id: PageId) -> FileResult<()> {
        match self.id {
            Some(current) if current != id => Err(FileError::PageIdAlreadySet {
                current,
                requested: id,
            }),
            _ => {
                self.id = Some(id);
                Ok(())
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn owner(&self) -> Option<PageFileId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: PageFileId) {
        self.owner = Some(owner);
    }
}

impl PartialEq for PageMeta {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PageMeta {}

impl Hash for PageMeta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A record stored in a page file.
///
/// Implementors embed a [`PageMeta`] and define their binary payload.
/// `decode` receives the whole zero-padded payload region of a slot, so the
/// encoding has to know its own length.
pub trait Page: Clone + Send + 'static {
    fn meta(&self) -> &PageMeta;

    fn meta_mut(&mut self) -> &mut PageMeta;

    /// Append the payload bytes to `buf`
    fn encode(&self, buf: &mut Vec<u8>) -> FileResult<()>;

    /// Rebuild a page from payload bytes; the id is assigned by the caller
    fn decode(bytes: &[u8]) -> FileResult<Self>;

    fn id(&self) -> Option<PageId> {
        self.meta().id()
    }

    fn set_id(&mut self, id: PageId) -> FileResult<()> {
        self.meta_mut().set_id(id)
    }

    fn is_dirty(&self) -> bool {
        self.meta().is_dirty()
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.meta_mut().set_dirty(dirty);
    }

    fn owner(&self) -> Option<PageFileId> {
        self.meta().owner()
    }

    fn set_owner(&mut self, owner: PageFileId) {
        self.meta_mut().set_owner(owner);
    }
}

/// Page holding an opaque byte payload.
///
/// Encoded as a 4-byte big-endian length followed by the bytes.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    meta: PageMeta,
    data: Vec<u8>,
}

impl RawPage {
    const LEN_SIZE: usize = 4;

    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            meta: PageMeta::new(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the payload and mark the page dirty
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
        self.meta.set_dirty(true);
    }

    /// Bytes this page occupies once encoded (without the slot tag)
    pub fn encoded_len(&self) -> usize {
        Self::LEN_SIZE + self.data.len()
    }
}

impl Page for RawPage {
    fn meta(&self) -> &PageMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut PageMeta {
        &mut self.meta
    }

    fn encode(&self, buf: &mut Vec<u8>) -> FileResult<()> {
        let len = u32::try_from(self.data.len())
            .map_err(|_| FileError::Codec(format!("payload of {} bytes", self.data.len())))?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.data);
        Ok(())
    }

    fn decode(bytes: &[u8]) -> FileResult<Self> {
        if bytes.len() < Self::LEN_SIZE {
            return Err(FileError::Codec(format!(
                "Not enough data for payload length: {} bytes",
                bytes.len()
            )));
        }

        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let end = Self::LEN_SIZE + len;
        if end > bytes.len() {
            return Err(FileError::Codec(format!(
                "Payload length {} exceeds slot of {} bytes",
                len,
                bytes.len()
            )));
        }

        Ok(Self::new(&bytes[Self::LEN_SIZE..end]))
    }
}

impl PartialEq for RawPage {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
    }
}

impl Eq for RawPage {}

impl Hash for RawPage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.hash(state);
    }
}
