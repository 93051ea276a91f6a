//! Client-side handle to one block in one processor.

use crossbeam_channel::Sender;
use motive_core::{Dimension, HandleId, ProcessorId, SlotError, SlotIndex};

use crate::processor::Processor;
use crate::storage::SlotStorage;

/// Owns at most one block in one processor.
///
/// A motivator remembers the processor it was initialized on and the
/// handle that processor issued. It never caches the block's index: every
/// query resolves the handle, so relocation during compaction and
/// invalidation by the processor are seen immediately.
///
/// Motivators are deliberately not `Clone`. Copying ownership goes through
/// [`transfer_from`](Self::transfer_from), and the block is released right
/// away with [`invalidate`](Self::invalidate). Dropping a bound motivator
/// queues its handle on the processor's release queue; the block is
/// removed at the processor's next compaction.
#[derive(Debug, Default)]
pub struct Motivator {
    binding: Option<Binding>,
}

#[derive(Debug)]
struct Binding {
    processor: ProcessorId,
    handle: HandleId,
    release: Sender<HandleId>,
}

impl Motivator {
    /// An unbound motivator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and initialize a block of `width` in `processor`.
    ///
    /// If this motivator already owns a block in `processor`, that block is
    /// removed first and the handle is reused. A handle the processor has
    /// since retired is replaced by a fresh one.
    ///
    /// # Errors
    ///
    /// - [`SlotError::WrongProcessor`] if the motivator is bound to another
    ///   processor; it must be invalidated there first.
    /// - [`SlotError::CapacityExceeded`] if `processor` cannot grow. The
    ///   motivator is left unbound.
    pub fn initialize<S: SlotStorage>(
        &mut self,
        processor: &mut Processor<S>,
        init: &S::Init,
        width: Dimension,
    ) -> Result<SlotIndex, SlotError> {
        let reusable = match &self.binding {
            Some(binding) => {
                check_processor(binding.processor, processor)?;
                let handle = binding.handle;
                if let Some(index) = processor.index_of(handle) {
                    processor.remove_slot(index);
                }
                processor.core().contains_handle(handle).then_some(handle)
            }
            None => None,
        };
        let handle = match reusable {
            Some(handle) => handle,
            None => processor.new_handle(),
        };
        match processor.initialize_slot(init, width, handle) {
            Ok(index) => {
                self.bind(processor, handle);
                Ok(index)
            }
            Err(err) => {
                processor.release_handle(handle);
                self.binding = None;
                Err(err)
            }
        }
    }

    /// Release this motivator's block and handle.
    ///
    /// Unbound motivators are left as they are.
    ///
    /// # Errors
    ///
    /// [`SlotError::WrongProcessor`] if the motivator belongs to another
    /// processor.
    pub fn invalidate<S: SlotStorage>(
        &mut self,
        processor: &mut Processor<S>,
    ) -> Result<(), SlotError> {
        let Some(binding) = &self.binding else {
            return Ok(());
        };
        check_processor(binding.processor, processor)?;
        processor.release_handle(binding.handle);
        self.binding = None;
        Ok(())
    }

    /// Take over the block owned by `source`.
    ///
    /// Any block this motivator owned is released first. Afterwards
    /// `source` is unbound and this motivator resolves to the same index,
    /// width and data `source` had.
    ///
    /// # Errors
    ///
    /// - [`SlotError::InvalidHandle`] if `source` owns no block.
    /// - [`SlotError::WrongProcessor`] if either motivator belongs to
    ///   another processor.
    pub fn transfer_from<S: SlotStorage>(
        &mut self,
        source: &mut Motivator,
        processor: &mut Processor<S>,
    ) -> Result<(), SlotError> {
        let index = source.index(processor)?;
        let Some(old_handle) = source.handle() else {
            return Err(SlotError::InvalidHandle { handle: None });
        };
        self.invalidate(processor)?;

        let handle = processor.new_handle();
        processor.transfer_slot(index, handle);
        processor.release_handle(old_handle);
        source.binding = None;
        self.bind(processor, handle);
        Ok(())
    }

    /// The index of the block this motivator owns.
    ///
    /// # Errors
    ///
    /// - [`SlotError::WrongProcessor`] if bound to another processor.
    /// - [`SlotError::InvalidHandle`] if unbound, or if the processor
    ///   removed the block.
    pub fn index<S: SlotStorage>(&self, processor: &Processor<S>) -> Result<SlotIndex, SlotError> {
        let binding = self
            .binding
            .as_ref()
            .ok_or(SlotError::InvalidHandle { handle: None })?;
        check_processor(binding.processor, processor)?;
        processor
            .index_of(binding.handle)
            .ok_or(SlotError::InvalidHandle {
                handle: Some(binding.handle),
            })
    }

    /// Whether this motivator owns a live block in `processor`.
    pub fn is_valid<S: SlotStorage>(&self, processor: &Processor<S>) -> bool {
        self.index(processor).is_ok()
    }

    /// Width of the owned block.
    ///
    /// # Errors
    ///
    /// Same as [`index`](Self::index).
    pub fn dimensions<S: SlotStorage>(
        &self,
        processor: &Processor<S>,
    ) -> Result<Dimension, SlotError> {
        self.index(processor).map(|index| processor.dimensions(index))
    }

    /// The processor this motivator was initialized on.
    pub fn processor_id(&self) -> Option<ProcessorId> {
        self.binding.as_ref().map(|b| b.processor)
    }

    /// The handle issued by that processor.
    pub fn handle(&self) -> Option<HandleId> {
        self.binding.as_ref().map(|b| b.handle)
    }

    fn bind<S: SlotStorage>(&mut self, processor: &Processor<S>, handle: HandleId) {
        self.binding = Some(Binding {
            processor: processor.id(),
            handle,
            release: processor.core().release_sender(),
        });
    }
}

impl Drop for Motivator {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take() {
            // Disconnected only when the processor is gone, and its blocks with it.
            let _ = binding.release.send(binding.handle);
        }
    }
}

fn check_processor<S: SlotStorage>(
    expected: ProcessorId,
    processor: &Processor<S>,
) -> Result<(), SlotError> {
    let found = processor.id();
    if expected == found {
        Ok(())
    } else {
        Err(SlotError::WrongProcessor { expected, found })
    }
}
