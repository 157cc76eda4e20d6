//! Heap allocator for GC-managed objects
//!
//! Objects live in an arena of cells. Freed cells go on a free list and bump
//! their generation so stale handles stop resolving.

use super::{GcRef, HeapObject};
use crate::object::{Class, Closure, Instance};
use crate::{VmError, VmResult};

#[derive(Debug)]
struct Cell {
    generation: u32,
    marked: bool,
    object: Option<HeapObject>,
}

/// Heap allocator for GC-managed memory
#[derive(Debug, Default)]
pub struct Heap {
    /// All cells, live or free
    cells: Vec<Cell>,

    /// Indices of free cells
    free: Vec<u32>,

    /// Number of live objects
    live: usize,

    /// Maximum number of live objects (None = unlimited)
    max_objects: Option<usize>,
}

impl Heap {
    /// Create an unlimited heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a heap with an object limit
    pub fn with_limit(max_objects: Option<usize>) -> Self {
        Self {
            max_objects,
            ..Self::default()
        }
    }

    /// Allocate an object
    ///
    /// Hands the object back when the heap limit is reached.
    pub fn allocate(&mut self, object: HeapObject) -> Result<GcRef, HeapObject> {
        if let Some(max) = self.max_objects {
            if self.live >= max {
                return Err(object);
            }
        }

        self.live += 1;
        if let Some(index) = self.free.pop() {
            let cell = &mut self.cells[index as usize];
            cell.marked = false;
            cell.object = Some(object);
            return Ok(GcRef::new(index, cell.generation));
        }

        let index = self.cells.len() as u32;
        self.cells.push(Cell {
            generation: 0,
            marked: false,
            object: Some(object),
        });
        Ok(GcRef::new(index, 0))
    }

    /// Get a live object
    pub fn get(&self, r: GcRef) -> Option<&HeapObject> {
        self.cells
            .get(r.index())
            .filter(|cell| cell.generation == r.generation())
            .and_then(|cell| cell.object.as_ref())
    }

    /// Get a live object mutably
    pub fn get_mut(&mut self, r: GcRef) -> Option<&mut HeapObject> {
        self.cells
            .get_mut(r.index())
            .filter(|cell| cell.generation == r.generation())
            .and_then(|cell| cell.object.as_mut())
    }

    /// Check if a handle still refers to a live object
    pub fn contains(&self, r: GcRef) -> bool {
        self.get(r).is_some()
    }

    /// Get a class
    pub fn class(&self, r: GcRef) -> VmResult<&Class> {
        match self.get(r) {
            Some(HeapObject::Class(class)) => Ok(class),
            Some(other) => Err(mismatch("class", other)),
            None => Err(VmError::InvalidReference(r)),
        }
    }

    /// Get a class mutably
    pub fn class_mut(&mut self, r: GcRef) -> VmResult<&mut Class> {
        match self.get_mut(r) {
            Some(HeapObject::Class(class)) => Ok(class),
            Some(other) => Err(mismatch("class", other)),
            None => Err(VmError::InvalidReference(r)),
        }
    }

    /// Get an instance segment
    pub fn instance(&self, r: GcRef) -> VmResult<&Instance> {
        match self.get(r) {
            Some(HeapObject::Instance(instance)) => Ok(instance),
            Some(other) => Err(mismatch("instance", other)),
            None => Err(VmError::InvalidReference(r)),
        }
    }

    /// Get an instance segment mutably
    pub fn instance_mut(&mut self, r: GcRef) -> VmResult<&mut Instance> {
        match self.get_mut(r) {
            Some(HeapObject::Instance(instance)) => Ok(instance),
            Some(other) => Err(mismatch("instance", other)),
            None => Err(VmError::InvalidReference(r)),
        }
    }

    /// Get a closure
    pub fn closure(&self, r: GcRef) -> VmResult<&Closure> {
        match self.get(r) {
            Some(HeapObject::Closure(closure)) => Ok(closure),
            Some(other) => Err(mismatch("closure", other)),
            None => Err(VmError::InvalidReference(r)),
        }
    }

    /// Mark a live object; returns true only the first time
    pub(crate) fn mark(&mut self, r: GcRef) -> bool {
        match self.cells.get_mut(r.index()) {
            Some(cell)
                if cell.generation == r.generation() && cell.object.is_some() && !cell.marked =>
            {
                cell.marked = true;
                true
            }
            _ => false,
        }
    }

    /// Free every unmarked object and clear marks on the survivors
    pub(crate) fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (index, cell) in self.cells.iter_mut().enumerate() {
            if cell.object.is_none() {
                continue;
            }
            if cell.marked {
                cell.marked = false;
            } else {
                cell.object = None;
                cell.generation = cell.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }

    /// Number of live objects
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of cells (live and free)
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Maximum number of live objects
    pub fn max_objects(&self) -> Option<usize> {
        self.max_objects
    }
}

fn mismatch(expected: &str, found: &HeapObject) -> VmError {
    VmError::TypeError(format!(
        "expected {}, found {}",
        expected,
        found.type_name()
    ))
}
