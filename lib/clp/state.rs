//! Abstract machine state.
//!
//! A `State` maps registers, temporaries and memory cells to `Value`s. Memory
//! is sparse: a missing cell holds ALL. Cells are spread over `BUCKET_COUNT`
//! buckets, each bucket being a persistent list sorted by address. Cloning a
//! state shares the lists, and updates rebuild only the prefix of the list in
//! front of the modified cell.

use crate::clp::value::{Kind, Value};
use crate::{Error, RC};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Number of memory buckets of a state.
pub const BUCKET_COUNT: usize = 64;

fn bucket_index(address: u32) -> usize {
    ((address >> 2) as usize) & (BUCKET_COUNT - 1)
}

#[derive(Debug)]
struct Node {
    address: u32,
    value: Value,
    next: Link,
}

type Link = Option<RC<Node>>;

/// A persistent list of memory cells, sorted by address.
#[derive(Clone, Debug, Default)]
struct Bucket {
    head: Link,
}

struct BucketIter<'a> {
    link: &'a Link,
}

impl<'a> Iterator for BucketIter<'a> {
    type Item = (u32, Value);

    fn next(&mut self) -> Option<(u32, Value)> {
        self.link.as_ref().map(|node| {
            self.link = &node.next;
            (node.address, node.value)
        })
    }
}

impl Bucket {
    /// Prepend `cells`, given in address order, to `tail`.
    fn build(cells: Vec<(u32, Value)>, tail: Link) -> Bucket {
        let head = cells
            .into_iter()
            .rev()
            .fold(tail, |next, (address, value)| {
                Some(RC::new(Node {
                    address,
                    value,
                    next,
                }))
            });
        Bucket { head }
    }

    fn iter(&self) -> BucketIter<'_> {
        BucketIter { link: &self.head }
    }

    fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn get(&self, address: u32) -> Option<Value> {
        self.iter()
            .take_while(|(a, _)| *a <= address)
            .find(|(a, _)| *a == address)
            .map(|(_, value)| value)
    }

    /// A copy of this bucket where the cell at `address` holds `value`, or is
    /// removed when `value` is `None`.
    fn with(&self, address: u32, value: Option<Value>) -> Bucket {
        let mut prefix = Vec::new();
        let mut link = &self.head;
        while let Some(node) = link {
            if node.address >= address {
                break;
            }
            prefix.push((node.address, node.value));
            link = &node.next;
        }
        let rest = match link {
            Some(node) if node.address == address => node.next.clone(),
            _ => link.clone(),
        };
        if let Some(value) = value {
            prefix.push((address, value));
        }
        Bucket::build(prefix, rest)
    }

    /// A copy of this bucket without the cells whose address matches `remove`.
    /// The part of the list after the last removed cell is shared.
    fn without<F: Fn(u32) -> bool>(&self, remove: F) -> Bucket {
        let cells: Vec<&RC<Node>> = {
            let mut cells = Vec::new();
            let mut link = &self.head;
            while let Some(node) = link {
                cells.push(node);
                link = &node.next;
            }
            cells
        };
        let last = match cells.iter().rposition(|node| remove(node.address)) {
            Some(last) => last,
            None => return self.clone(),
        };
        let kept = cells[..last]
            .iter()
            .filter(|node| !remove(node.address))
            .map(|node| (node.address, node.value))
            .collect();
        Bucket::build(kept, cells[last].next.clone())
    }

    /// Single-pass merge of two sorted buckets.
    ///
    /// Cells present in both buckets are combined and dropped when the result
    /// is ALL. Cells present in one bucket only are kept when `keep_single`
    /// is set. A suffix shared by both lists is shared by the result.
    fn merge<F>(&self, other: &Bucket, keep_single: bool, combine: F) -> Bucket
    where
        F: Fn(&Value, &Value) -> Value,
    {
        let mut cells = Vec::new();
        let mut a = &self.head;
        let mut b = &other.head;
        let tail = loop {
            match (a, b) {
                (Some(x), Some(y)) => {
                    if RC::ptr_eq(x, y) {
                        break a.clone();
                    }
                    if x.address < y.address {
                        if keep_single {
                            cells.push((x.address, x.value));
                        }
                        a = &x.next;
                    } else if x.address > y.address {
                        if keep_single {
                            cells.push((y.address, y.value));
                        }
                        b = &y.next;
                    } else {
                        let value = combine(&x.value, &y.value);
                        if !value.is_all() {
                            cells.push((x.address, value));
                        }
                        a = &x.next;
                        b = &y.next;
                    }
                }
                (Some(_), None) => break if keep_single { a.clone() } else { None },
                (None, Some(_)) => break if keep_single { b.clone() } else { None },
                (None, None) => break None,
            }
        };
        Bucket::build(cells, tail)
    }

    fn equals(&self, other: &Bucket) -> bool {
        let mut a = &self.head;
        let mut b = &other.head;
        loop {
            match (a, b) {
                (Some(x), Some(y)) => {
                    if RC::ptr_eq(x, y) {
                        return true;
                    }
                    if x.address != y.address || x.value != y.value {
                        return false;
                    }
                    a = &x.next;
                    b = &y.next;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Drop for Bucket {
    fn drop(&mut self) {
        let mut link = self.head.take();
        while let Some(node) = link {
            match RC::try_unwrap(node) {
                Ok(mut node) => link = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Registers, temporaries and memory of the abstract machine.
#[derive(Clone, Debug)]
pub struct State {
    default: Value,
    registers: Vec<Value>,
    temporaries: Vec<Value>,
    memory: Vec<Bucket>,
}

impl State {
    fn with_default(default: Value) -> State {
        State {
            default,
            registers: Vec::new(),
            temporaries: Vec::new(),
            memory: vec![Bucket::default(); BUCKET_COUNT],
        }
    }

    /// The bottom state, for unreachable program points.
    pub fn empty() -> State {
        State::with_default(Value::NONE)
    }

    /// The top state, where everything is ALL.
    pub fn full() -> State {
        State::with_default(Value::ALL)
    }

    pub fn is_bottom(&self) -> bool {
        self.default.is_none()
    }

    /// True if nothing at all is known in this state.
    pub fn is_full(&self) -> bool {
        !self.is_bottom()
            && self.registers.iter().all(Value::is_all)
            && self.temporaries.iter().all(Value::is_all)
            && self.memory.iter().all(Bucket::is_empty)
    }

    /// Value of the register, temporary or memory cell designated by `addr`.
    pub fn get(&self, addr: &Value) -> Result<Value, Error> {
        if !addr.is_const() {
            return Err(Error::NonConstantAddress(*addr));
        }
        let value = match addr.kind() {
            Kind::Reg => {
                let index = addr.base();
                let slot = if index >= 0 {
                    self.registers.get(index as usize)
                } else {
                    self.temporaries.get((-(index as i64) - 1) as usize)
                };
                slot.copied().unwrap_or(self.default)
            }
            _ => {
                let address = addr.base() as u32;
                self.memory[bucket_index(address)]
                    .get(address)
                    .unwrap_or(self.default)
            }
        };
        Ok(value)
    }

    /// Assign `value` to what `addr` designates.
    ///
    /// A constant address updates one cell. A non-constant memory address
    /// forgets every cell it may designate, and ALL forgets the whole memory.
    /// Assigning NONE turns the state into bottom.
    pub fn set(&mut self, addr: &Value, value: Value) -> Result<(), Error> {
        match addr.kind() {
            Kind::None => return Err(Error::InvalidAddress(*addr)),
            Kind::Reg if !addr.is_const() => return Err(Error::NonConstantAddress(*addr)),
            _ => {}
        }
        if self.is_bottom() {
            return Ok(());
        }
        if value.is_none() {
            *self = State::empty();
            return Ok(());
        }

        match addr.kind() {
            Kind::Reg => {
                let index = addr.base();
                let (slots, slot) = if index >= 0 {
                    (&mut self.registers, index as usize)
                } else {
                    (&mut self.temporaries, (-(index as i64) - 1) as usize)
                };
                if slot >= slots.len() {
                    slots.resize(slot + 1, Value::ALL);
                }
                slots[slot] = value;
            }
            Kind::All => self.forget_memory(),
            _ if !addr.is_const() => {
                if addr.uwrap() {
                    self.forget_memory();
                } else {
                    let (a, b) = (addr.lower() as u32, addr.upper() as u32);
                    let (low, high) = if a <= b { (a, b) } else { (b, a) };
                    self.remove_cells(|address| low <= address && address <= high);
                }
            }
            _ => {
                let address = addr.base() as u32;
                let index = bucket_index(address);
                let cell = if value.is_all() { None } else { Some(value) };
                self.memory[index] = self.memory[index].with(address, cell);
            }
        }
        Ok(())
    }

    /// Forget every memory cell in `[base, base + size)`.
    pub fn clear(&mut self, base: u32, size: u32) {
        if self.is_bottom() {
            return;
        }
        let low = base as u64;
        let high = low + size as u64;
        self.remove_cells(|address| {
            let address = address as u64;
            (low <= address && address < high) || address + (1 << 32) < high
        });
    }

    fn forget_memory(&mut self) {
        self.memory = vec![Bucket::default(); BUCKET_COUNT];
    }

    fn remove_cells<F: Fn(u32) -> bool>(&mut self, remove: F) {
        for bucket in self.memory.iter_mut() {
            *bucket = bucket.without(&remove);
        }
    }

    /// Forget the temporaries, which only live inside one machine instruction.
    pub fn clear_temporaries(&mut self) {
        self.temporaries.clear();
    }

    fn register(&self, index: usize) -> Value {
        self.registers.get(index).copied().unwrap_or(Value::ALL)
    }

    fn combine_registers<F>(&mut self, other: &State, combine: F)
    where
        F: Fn(&Value, &Value) -> Value,
    {
        let count = std::cmp::max(self.registers.len(), other.registers.len());
        self.registers = (0..count)
            .map(|index| combine(&self.register(index), &other.register(index)))
            .collect();
        while self.registers.last().map(Value::is_all).unwrap_or(false) {
            self.registers.pop();
        }
    }

    fn combine_memory<F>(&mut self, other: &State, keep_single: bool, combine: F)
    where
        F: Fn(&Value, &Value) -> Value,
    {
        for (bucket, other_bucket) in self.memory.iter_mut().zip(other.memory.iter()) {
            *bucket = bucket.merge(other_bucket, keep_single, &combine);
        }
    }

    /// Least upper bound of two states.
    pub fn join(&mut self, other: &State) {
        if other.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = other.clone();
            return;
        }
        self.combine_registers(other, Value::join);
        self.combine_memory(other, false, Value::join);
    }

    /// Widening of this state by the next iterate `other`. A known loop bound
    /// selects the bounded widening of values.
    pub fn widening(&mut self, other: &State, bound: Option<u32>) {
        if other.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = other.clone();
            return;
        }
        match bound {
            Some(bound) => {
                let widen = |a: &Value, b: &Value| a.ffwidening(b, bound);
                self.combine_registers(other, widen);
                self.combine_memory(other, false, widen);
            }
            None => {
                self.combine_registers(other, Value::widening);
                self.combine_memory(other, false, Value::widening);
            }
        }
    }

    /// Merge where a value known in one state only is kept as is.
    pub fn augment(&mut self, other: &State) {
        if other.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = other.clone();
            return;
        }
        let augment = |a: &Value, b: &Value| {
            if a.is_all() {
                *b
            } else if b.is_all() {
                *a
            } else {
                a.join(b)
            }
        };
        self.combine_registers(other, augment);
        self.combine_memory(other, true, augment);
    }

    pub fn equals(&self, other: &State) -> bool {
        if self.is_bottom() || other.is_bottom() {
            return self.is_bottom() == other.is_bottom();
        }
        let count = std::cmp::max(self.registers.len(), other.registers.len());
        (0..count).all(|index| self.register(index) == other.register(index))
            && self
                .memory
                .iter()
                .zip(other.memory.iter())
                .all(|(a, b)| a.equals(b))
    }

    /// Registers with a known value.
    pub fn registers(&self) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.registers
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_all())
            .map(|(index, value)| (index, *value))
    }

    /// Memory cells with a known value, in address order.
    pub fn cells(&self) -> Vec<(u32, Value)> {
        let mut cells: Vec<(u32, Value)> =
            self.memory.iter().flat_map(|bucket| bucket.iter()).collect();
        cells.sort_by_key(|(address, _)| *address);
        cells
    }
}

impl PartialEq for State {
    fn eq(&self, other: &State) -> bool {
        self.equals(other)
    }
}

impl Eq for State {}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "None (bottom)");
        }
        let mut items = Vec::new();
        for (index, value) in self.registers() {
            if value.kind() == Kind::Val {
                items.push(format!("r{} = {}", index, value));
            }
        }
        for (address, value) in self.cells() {
            items.push(format!("0x{:08x} = {}", address, value));
        }
        for (index, value) in self.temporaries.iter().enumerate() {
            if !value.is_all() {
                items.push(format!("t{} = {}", index + 1, value));
            }
        }
        write!(f, "{{{}}}", items.join(", "))
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_bottom() {
            return serializer.serialize_str("_");
        }
        if self.is_full() {
            return serializer.serialize_str("T");
        }
        let registers: BTreeMap<String, Value> = self
            .registers()
            .map(|(index, value)| (format!("r{}", index), value))
            .collect();
        let memory: BTreeMap<String, Value> = self
            .cells()
            .into_iter()
            .map(|(address, value)| (format!("0x{:08x}", address), value))
            .collect();
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("registers", &registers)?;
        map.serialize_entry("memory", &memory)?;
        map.end()
    }
}
