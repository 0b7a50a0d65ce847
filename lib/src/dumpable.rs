//! Records that spill to the dump store and refault through mapped views.

use crate::{
    error::Error,
    store::{DumpStore, MappedChunk},
};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A fixed-wire-size element that can be spilled to the dump store.
///
/// Elements are written as raw little-endian fields, so the on-disk layout
/// is independent of in-memory struct padding.
pub trait Element: Copy + Send + Sync + 'static {
    /// Encoded size of one element in bytes.
    const WIRE_SIZE: usize;

    /// Decode one element from the front of `buf`.
    ///
    /// `buf` holds at least [`WIRE_SIZE`](Element::WIRE_SIZE) bytes.
    fn read(buf: &[u8]) -> Self;

    /// Append the encoded element to `out`.
    fn write(self, out: &mut Vec<u8>);
}

struct State<E> {
    /// Owning RAM copy.
    data: Vec<E>,
    /// Live mapped view, when faulted in after a discard.
    chunk: Option<MappedChunk>,
    /// Offset of the last dump, used as the join key into the store.
    file_offset: Option<u64>,
    /// Element count. Survives a discard of the RAM copy.
    len: usize,
    valid: bool,
    discarded: bool,
}

impl<E: Element> State<E> {
    fn needs_load(&self) -> bool {
        self.valid && self.discarded && self.chunk.is_none() && self.len > 0
    }

    fn load(&mut self, store: &DumpStore) -> Result<(), Error> {
        let offset = self.file_offset.ok_or(Error::MissingFileOffset)?;
        let chunk = store.read(offset, self.len * E::WIRE_SIZE)?;
        self.chunk = Some(chunk);
        Ok(())
    }
}

/// A generic header-plus-payload record.
///
/// At most one of the RAM copy and the mapped view is authoritative at any
/// time. Once [`dump`](Dumpable::dump) discards the RAM copy, reads fault a
/// mapped view back in through the owning store.
pub struct Dumpable<E: Element> {
    store: Arc<DumpStore>,
    state: RwLock<State<E>>,
}

impl<E: Element> Dumpable<E> {
    /// Construct an empty record bound to the given store.
    pub fn new(store: Arc<DumpStore>) -> Dumpable<E> {
        Self::with_len(store, 0)
    }

    /// Construct an empty record that expects `len` elements.
    pub fn with_len(store: Arc<DumpStore>, len: usize) -> Dumpable<E> {
        Dumpable {
            store,
            state: RwLock::new(State {
                data: Vec::new(),
                chunk: None,
                file_offset: None,
                len,
                valid: false,
                discarded: false,
            }),
        }
    }

    /// Element count recorded in the header.
    pub fn len(&self) -> usize {
        self.state.read().len
    }

    /// Whether the record holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self) -> bool {
        self.state.read().valid
    }

    pub fn is_discarded(&self) -> bool {
        self.state.read().discarded
    }

    /// Offset of the last dump, if the record has been written.
    pub fn file_offset(&self) -> Option<u64> {
        self.state.read().file_offset
    }

    /// Replace the payload with `data` and mark the record valid.
    pub fn replace_data(&self, data: Vec<E>) {
        let mut state = self.state.write();
        state.len = data.len();
        state.data = data;
        state.chunk = None;
        state.valid = true;
        state.discarded = false;
    }

    /// Append one element and mark the record valid.
    pub fn push(&self, element: E) {
        let mut state = self.state.write();
        state.data.push(element);
        state.len += 1;
        state.valid = true;
    }

    /// Drop the payload and mark the record invalid.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.data = Vec::new();
        state.chunk = None;
        state.valid = false;
    }

    /// Write the RAM payload to the store, remembering the offset.
    ///
    /// With `discard` the RAM copy and any live view are released;
    /// subsequent reads fault the payload back in from the store.
    pub fn dump(&self, discard: bool) -> Result<(), Error> {
        let mut state = self.state.write();

        if state.data.is_empty() {
            return Err(Error::EmptyRecord);
        }

        let mut bytes = Vec::with_capacity(state.data.len() * E::WIRE_SIZE);

        for element in &state.data {
            element.write(&mut bytes);
        }

        let offset = self.store.write(&bytes)?;
        state.file_offset = Some(offset);

        if discard {
            state.data = Vec::new();
            state.chunk = None;
            state.discarded = true;
        }

        Ok(())
    }

    /// Promote a live mapped view back into the owning RAM copy.
    pub fn copy_map_view(&self) -> Result<(), Error> {
        let mut state = self.state.write();

        if !state.discarded {
            return Ok(());
        }

        if state.chunk.is_none() {
            state.load(&self.store)?;
        }

        let chunk = match state.chunk.take() {
            Some(chunk) => chunk,
            None => return Err(Error::MissingFileOffset),
        };

        let buf = chunk.as_slice();
        let mut data = Vec::with_capacity(state.len);

        for i in 0..state.len {
            data.push(E::read(&buf[i * E::WIRE_SIZE..]));
        }

        state.data = data;
        state.discarded = false;
        Ok(())
    }

    /// A read-only view over the payload, faulting the mapped view in when
    /// the RAM copy has been discarded.
    ///
    /// An invalid or unmappable record yields an empty view.
    pub fn view(&self) -> ElementView<'_, E> {
        let guard = self.ensure_loaded();
        ElementView { guard }
    }

    fn ensure_loaded(&self) -> RwLockReadGuard<'_, State<E>> {
        let guard = self.state.read();

        if !guard.needs_load() {
            return guard;
        }

        drop(guard);
        let mut guard = self.state.write();

        if guard.needs_load() {
            // Mapping failures leave the record unmappable; the view over
            // it is empty.
            let _ = guard.load(&self.store);
        }

        RwLockWriteGuard::downgrade(guard)
    }
}

impl Dumpable<u8> {
    /// The payload as a contiguous byte slice, RAM or mapped.
    pub fn bytes(&self) -> ByteView<'_> {
        let guard = self.ensure_loaded();
        ByteView { guard }
    }
}

/// Read-only view over a record's elements.
pub struct ElementView<'a, E: Element> {
    guard: RwLockReadGuard<'a, State<E>>,
}

impl<'a, E: Element> ElementView<'a, E> {
    /// Number of accessible elements. Zero when the record is invalid or
    /// could not be mapped.
    pub fn len(&self) -> usize {
        if !self.guard.valid {
            return 0;
        }

        if !self.guard.discarded {
            return self.guard.data.len();
        }

        match self.guard.chunk {
            Some(_) => self.guard.len,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the element at `index`.
    pub fn get(&self, index: usize) -> Option<E> {
        if index >= self.len() {
            return None;
        }

        if !self.guard.discarded {
            return self.guard.data.get(index).copied();
        }

        let chunk = self.guard.chunk.as_ref()?;
        let buf = chunk.as_slice();
        let start = index * E::WIRE_SIZE;
        Some(E::read(&buf[start..]))
    }

    /// Iterate over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Read-only byte view over a `u8` record.
pub struct ByteView<'a> {
    guard: RwLockReadGuard<'a, State<u8>>,
}

impl<'a> ByteView<'a> {
    /// The payload bytes. Empty when the record is invalid or unmappable.
    pub fn as_slice(&self) -> &[u8] {
        if !self.guard.valid {
            return &[];
        }

        if !self.guard.discarded {
            return &self.guard.data;
        }

        match self.guard.chunk.as_ref() {
            Some(chunk) => chunk.as_slice(),
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Dumpable;
    use crate::store::DumpStore;
    use std::sync::Arc;

    fn store() -> (tempfile::TempDir, Arc<DumpStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = DumpStore::with_capacity(dir.path().join("scratch.bin"), 4096).unwrap();
        (dir, Arc::new(store))
    }

    #[test]
    fn test_dump_discard_reload_round_trip() {
        let (_dir, store) = store();
        let record = Dumpable::<u8>::new(store);

        record.replace_data(vec![1, 2, 3, 4, 5]);
        record.dump(true).unwrap();

        assert!(record.is_discarded());
        assert_eq!(5, record.len());

        let view = record.view();
        assert_eq!(5, view.len());
        let elements: Vec<u8> = view.iter().collect();
        assert_eq!(vec![1, 2, 3, 4, 5], elements);
    }

    #[test]
    fn test_dump_without_discard_keeps_ram_copy() {
        let (_dir, store) = store();
        let record = Dumpable::<u8>::new(store);

        record.replace_data(vec![9, 8, 7]);
        record.dump(false).unwrap();

        assert!(!record.is_discarded());
        assert_eq!(Some(0), record.file_offset());
        assert_eq!(vec![9, 8, 7], record.view().iter().collect::<Vec<u8>>());
    }

    #[test]
    fn test_empty_record_refuses_dump() {
        let (_dir, store) = store();
        let record = Dumpable::<u8>::new(store);
        assert!(record.dump(true).is_err());
    }

    #[test]
    fn test_invalid_record_yields_empty_view() {
        let (_dir, store) = store();
        let record = Dumpable::<u8>::new(store);

        record.replace_data(vec![1, 2, 3]);
        record.invalidate();

        assert_eq!(0, record.view().len());
        assert_eq!(0, record.bytes().as_slice().len());
    }

    #[test]
    fn test_copy_map_view_promotes_to_ram() {
        let (_dir, store) = store();
        let record = Dumpable::<u8>::new(store);

        record.replace_data(vec![10, 20, 30]);
        record.dump(true).unwrap();
        assert!(record.is_discarded());

        record.copy_map_view().unwrap();
        assert!(!record.is_discarded());

        record.push(40);
        assert_eq!(
            vec![10, 20, 30, 40],
            record.view().iter().collect::<Vec<u8>>()
        );
    }

    #[test]
    fn test_round_trip_through_small_store_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Arc::new(DumpStore::with_capacity(dir.path().join("scratch.bin"), 16).unwrap());

        let payload: Vec<u8> = (0..255).collect();
        let record = Dumpable::<u8>::new(store);
        record.replace_data(payload.clone());
        record.dump(true).unwrap();

        assert_eq!(payload, record.view().iter().collect::<Vec<u8>>());
    }
}
