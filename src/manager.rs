use tracing::debug;

use crate::{session::{FlushMode, Level, Session, SessionError, StepResult}, slice::{BufferSlice, BufferSliceMut}};

/// Names a session held by a [SessionManager]. A handle stops
/// resolving once its session has been ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    session: Option<Session>
}

/// An arena of sessions addressed by [Handle]s, for callers that
/// cannot hold a [Session] value themselves
#[derive(Debug, Default)]
pub struct SessionManager {
    slots: Vec<Slot>,
    free: Vec<u32>
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a compressing session, see [Session::compressor]
    pub fn open_compressor(&mut self, level: Level) -> Result<Handle, SessionError> {
        Ok(self.insert(Session::compressor(level)?))
    }

    /// Opens a decompressing session, see [Session::decompressor]
    pub fn open_decompressor(&mut self, window_bits: Option<i32>) -> Result<Handle, SessionError> {
        Ok(self.insert(Session::decompressor(window_bits)?))
    }

    /// Takes ownership of an already created session
    pub fn insert(&mut self, session: Session) -> Handle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.session = Some(session);

        let handle = Handle {
            index,
            generation: slot.generation
        };
        debug!(%handle, "registered session");
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&Session> {
        self.slots.get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.session.as_ref())
    }

    fn get_mut(&mut self, handle: Handle) -> Result<&mut Session, SessionError> {
        self.slots.get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.session.as_mut())
            .ok_or(SessionError::SessionClosed)
    }

    /// Steps the session, see [Session::step_slices]
    pub fn step(&mut self, handle: Handle, flush: FlushMode, source: BufferSlice, dest: BufferSliceMut) -> Result<StepResult, SessionError> {
        self.get_mut(handle)?.step_slices(flush, source, dest)
    }

    /// Ends the session and frees its slot. The slot is freed even if
    /// the session reports an error while ending
    pub fn end(&mut self, handle: Handle) -> Result<(), SessionError> {
        let slot = self.slots.get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.session.is_some())
            .ok_or(SessionError::SessionClosed)?;

        let mut session = slot.session.take().ok_or(SessionError::SessionClosed)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);

        session.end()
    }

    /// Returns the number of open sessions
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
