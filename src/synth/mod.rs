// Purpose: Voice management, polyphony normalization, key events
// This layer sits above the dsp primitives and owns every voice

#[cfg(feature = "rtrb")]
pub mod handle;
pub mod message;
pub mod normalizer;
pub mod poly;
pub mod pool;
pub mod voice;

#[cfg(feature = "rtrb")]
pub use handle::{channel, KeyboardHandle, RenderEnds};
pub use message::{KeyMessage, MessageReceiver, NoMessages, PoolSnapshot, VoiceMeter};
pub use poly::KeySynth;
pub use pool::VoicePool;
