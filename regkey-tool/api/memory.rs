use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use regkey_raw::status::code;
use regkey_raw::{Access, KeyInfo, RawError, RawKey, RawValue, Result, RootKey, ValueTag};

use super::RegistryApi;

const FIRST_HANDLE: usize = 0x1000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Node {
    subkeys: Vec<String>,
    values: Vec<(String, RawValue)>,
    read_only: bool,
}

impl Node {
    fn value_index(&self, name: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|(stored, _)| stored.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
struct Store {
    /// Keys by lower-cased full path, e.g. `hkey_current_user\software`
    nodes: BTreeMap<String, Node>,
    /// Open handles to the node path they refer to
    handles: HashMap<usize, (String, Access)>,
    next_handle: usize,
    /// Enumeration index from which calls fail, and the status they fail with
    enum_failure: Option<(u32, u32)>,
}

/// Frozen copy of every key and value in a [`MemoryApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(BTreeMap<String, Node>);

/// In-process registry with the platform's status semantics
///
/// Lookups are case-insensitive, enumeration follows insertion order and
/// undersized buffers fail with `ERROR_MORE_DATA` exactly where the platform
/// would. Keys can be marked read-only to provoke `ERROR_ACCESS_DENIED`.
pub struct MemoryApi {
    store: RwLock<Store>,
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

fn node_path(parent: &str, child: &str) -> String {
    format!("{parent}\\{}", child.to_lowercase())
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|part| !part.is_empty())
}

fn status(op: &'static str, code: u32) -> RawError {
    RawError::Status { op, code }
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

/// Copy `text` plus a NUL into `buf`, the way the enumeration calls do.
fn write_name(op: &'static str, text: &str, buf: &mut [u16]) -> Result<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    if units.len() + 1 > buf.len() {
        return Err(RawError::MoreData { op, required: None });
    }
    buf[..units.len()].copy_from_slice(&units);
    buf[units.len()] = 0;
    Ok(text.to_string())
}

impl MemoryApi {
    pub fn new() -> Self {
        let nodes = RootKey::ALL
            .into_iter()
            .map(|root| (root.name().to_lowercase(), Node::default()))
            .collect();

        Self {
            store: RwLock::new(Store {
                nodes,
                handles: HashMap::new(),
                next_handle: FIRST_HANDLE,
                enum_failure: None,
            }),
        }
    }

    /// Create `path` under `root`, including any missing parents.
    pub fn create_key(&self, root: RootKey, path: &str) {
        let mut store = self.store.write();
        Self::create_in(&mut store, root, path);
    }

    /// Store a value, creating the key first if needed.
    pub fn put_value(&self, root: RootKey, path: &str, name: &str, tag: ValueTag, data: Vec<u8>) {
        let mut store = self.store.write();
        let key = Self::create_in(&mut store, root, path);
        if let Some(node) = store.nodes.get_mut(&key) {
            let value = RawValue::new(tag, data);
            match node.value_index(name) {
                Some(i) => node.values[i].1 = value,
                None => node.values.push((name.to_string(), value)),
            }
        }
    }

    /// Refuse write access to `path` from now on (or allow it again).
    pub fn set_read_only(&self, root: RootKey, path: &str, read_only: bool) {
        let mut store = self.store.write();
        let key = Self::create_in(&mut store, root, path);
        if let Some(node) = store.nodes.get_mut(&key) {
            node.read_only = read_only;
        }
    }

    /// Make every subkey and value enumeration at `index` or later fail with
    /// status `code`, as when a key shrinks or breaks mid-listing.
    pub fn fail_enum_from(&self, index: u32, code: u32) {
        self.store.write().enum_failure = Some((index, code));
    }

    pub fn clear_enum_failure(&self) {
        self.store.write().enum_failure = None;
    }

    pub fn value(&self, root: RootKey, path: &str, name: &str) -> Option<RawValue> {
        let store = self.store.read();
        let key = Self::find(&store, &root.name().to_lowercase(), path)?;
        let node = store.nodes.get(&key)?;
        node.value_index(name).map(|i| node.values[i].1.clone())
    }

    pub fn open_handles(&self) -> usize {
        self.store.read().handles.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.store.read().nodes.clone())
    }

    fn create_in(store: &mut Store, root: RootKey, path: &str) -> String {
        let mut current = root.name().to_lowercase();
        for part in components(path) {
            let child = node_path(&current, part);
            if !store.nodes.contains_key(&child) {
                if let Some(parent) = store.nodes.get_mut(&current) {
                    parent.subkeys.push(part.to_string());
                }
                store.nodes.insert(child.clone(), Node::default());
            }
            current = child;
        }
        current
    }

    /// Walk `path` from the node at `base`; `None` if any component is missing.
    fn find(store: &Store, base: &str, path: &str) -> Option<String> {
        let mut current = base.to_string();
        for part in components(path) {
            let child = node_path(&current, part);
            if !store.nodes.contains_key(&child) {
                return None;
            }
            current = child;
        }
        Some(current)
    }

    /// Node path and rights behind `key`, for predefined and opened keys alike.
    fn resolve(store: &Store, op: &'static str, key: RawKey) -> Result<(String, Access)> {
        if let Some(root) = RootKey::from_raw(key) {
            return Ok((root.name().to_lowercase(), Access::ReadWrite));
        }
        store
            .handles
            .get(&key.0)
            .map(|(path, access)| (path.clone(), *access))
            .ok_or_else(|| status(op, code::ERROR_INVALID_HANDLE))
    }

    fn with_node<T>(
        &self,
        op: &'static str,
        key: RawKey,
        f: impl FnOnce(&Node) -> Result<T>,
    ) -> Result<T> {
        let store = self.store.read();
        Self::with_node_in(&store, op, key, f)
    }

    fn with_node_in<T>(
        store: &Store,
        op: &'static str,
        key: RawKey,
        f: impl FnOnce(&Node) -> Result<T>,
    ) -> Result<T> {
        let (path, _) = Self::resolve(store, op, key)?;
        let node = store
            .nodes
            .get(&path)
            .ok_or_else(|| status(op, code::ERROR_FILE_NOT_FOUND))?;
        f(node)
    }

    fn with_enum_node<T>(
        &self,
        op: &'static str,
        key: RawKey,
        index: u32,
        f: impl FnOnce(&Node) -> Result<T>,
    ) -> Result<T> {
        let store = self.store.read();
        if let Some((from, failure)) = store.enum_failure {
            if index >= from {
                return Err(status(op, failure));
            }
        }
        Self::with_node_in(&store, op, key, f)
    }
}

impl RegistryApi for MemoryApi {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open_key(&self, parent: RawKey, path: &str, access: Access) -> Result<RawKey> {
        const OP: &str = "RegOpenKeyExW";

        if path.contains('\0') {
            return Err(RawError::InvalidName(path.to_string()));
        }

        let mut store = self.store.write();
        let (base, _) = Self::resolve(&store, OP, parent)?;
        let target =
            Self::find(&store, &base, path).ok_or_else(|| status(OP, code::ERROR_FILE_NOT_FOUND))?;

        let read_only = store.nodes.get(&target).is_some_and(|node| node.read_only);
        if read_only && access.can_write() {
            return Err(status(OP, code::ERROR_ACCESS_DENIED));
        }

        let id = store.next_handle;
        store.next_handle += 4;
        store.handles.insert(id, (target, access));

        Ok(RawKey(id))
    }

    fn close_key(&self, key: RawKey) -> Result<()> {
        if key.is_predefined() {
            return Ok(());
        }
        let mut store = self.store.write();
        store
            .handles
            .remove(&key.0)
            .map(|_| ())
            .ok_or_else(|| status("RegCloseKey", code::ERROR_INVALID_HANDLE))
    }

    fn query_info(&self, key: RawKey) -> Result<KeyInfo> {
        self.with_node("RegQueryInfoKeyW", key, |node| {
            Ok(KeyInfo {
                subkeys: node.subkeys.len() as u32,
                values: node.values.len() as u32,
                max_subkey_len: node.subkeys.iter().map(|s| utf16_len(s)).max().unwrap_or(0),
                max_value_name_len: node
                    .values
                    .iter()
                    .map(|(name, _)| utf16_len(name))
                    .max()
                    .unwrap_or(0),
                max_value_len: node
                    .values
                    .iter()
                    .map(|(_, value)| value.len() as u32)
                    .max()
                    .unwrap_or(0),
            })
        })
    }

    fn enum_key(&self, key: RawKey, index: u32, name: &mut [u16]) -> Result<String> {
        const OP: &str = "RegEnumKeyExW";
        self.with_enum_node(OP, key, index, |node| {
            let subkey = node
                .subkeys
                .get(index as usize)
                .ok_or_else(|| status(OP, code::ERROR_NO_MORE_ITEMS))?;
            write_name(OP, subkey, name)
        })
    }

    fn enum_value(&self, key: RawKey, index: u32, name: &mut [u16]) -> Result<(String, ValueTag)> {
        const OP: &str = "RegEnumValueW";
        self.with_enum_node(OP, key, index, |node| {
            let (value_name, value) = node
                .values
                .get(index as usize)
                .ok_or_else(|| status(OP, code::ERROR_NO_MORE_ITEMS))?;
            Ok((write_name(OP, value_name, name)?, value.tag))
        })
    }

    fn query_value(&self, key: RawKey, name: &str, data: &mut [u8]) -> Result<(usize, ValueTag)> {
        const OP: &str = "RegQueryValueExW";
        self.with_node(OP, key, |node| {
            let (_, value) = node
                .value_index(name)
                .map(|i| &node.values[i])
                .ok_or_else(|| status(OP, code::ERROR_FILE_NOT_FOUND))?;
            if value.len() > data.len() {
                return Err(RawError::MoreData {
                    op: OP,
                    required: Some(value.len()),
                });
            }
            data[..value.len()].copy_from_slice(&value.data);
            Ok((value.len(), value.tag))
        })
    }

    fn set_value(&self, key: RawKey, name: &str, tag: ValueTag, data: &[u8]) -> Result<()> {
        const OP: &str = "RegSetValueExW";

        let mut store = self.store.write();
        let (path, access) = Self::resolve(&store, OP, key)?;
        if !access.can_write() {
            return Err(status(OP, code::ERROR_ACCESS_DENIED));
        }
        let node = store
            .nodes
            .get_mut(&path)
            .ok_or_else(|| status(OP, code::ERROR_FILE_NOT_FOUND))?;

        let value = RawValue::new(tag, data.to_vec());
        match node.value_index(name) {
            Some(i) => node.values[i].1 = value,
            None => node.values.push((name.to_string(), value)),
        }
        Ok(())
    }
}
