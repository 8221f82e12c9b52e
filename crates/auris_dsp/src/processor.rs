//! DSP processor trait and the chain that runs a fixed, ordered sequence
//! of them over every frame.

/// Stream metadata passed to each processor's `process()` call.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub channels: usize,
}

impl ProcessContext {
    pub fn new(channels: usize) -> Self {
        Self { channels }
    }
}

/// A single stage in the DSP chain.
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts.
pub trait DspProcessor: Send {
    /// Process audio buffer in-place. Buffer format is interleaved:
    /// `[L0, R0, L1, R1, ...]`.
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Reset internal state (filter history, envelopes, etc).
    fn reset(&mut self);

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Whether this processor currently applies. Checked fresh on every
    /// `DspChain::process` call, so toggling is safe from another thread
    /// via an atomic flag inside the implementor.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// A fixed, ordered sequence of processors applied in place on every
/// frame. The chain's length is set once at assembly time; processors
/// are enabled or disabled in place, never inserted or removed after
/// assembly.
pub struct DspChain {
    processors: Vec<Box<dyn DspProcessor>>,
    context: ProcessContext,
}

impl DspChain {
    pub fn new(channels: usize) -> Self {
        Self {
            processors: Vec::new(),
            context: ProcessContext::new(channels),
        }
    }

    /// Appends a processor to the chain. Allocates: only call during
    /// pipeline assembly, never from the audio thread.
    pub fn add<P: DspProcessor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    /// Runs every enabled processor in insertion order.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        for processor in &mut self.processors {
            if processor.is_enabled() {
                processor.process(buffer, &self.context);
            }
        }
    }

    pub fn reset(&mut self) {
        for processor in &mut self.processors {
            processor.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// A processor that leaves the buffer untouched. Useful as a chain
/// placeholder, or as a baseline when testing that a disabled processor
/// truly has no effect.
pub struct PassthroughDsp;

impl DspProcessor for PassthroughDsp {
    fn process(&mut self, _buffer: &mut [f32], _context: &ProcessContext) {}

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Passthrough"
    }
}

/// A fixed-multiply gain stage, independent of [`crate::VolumeProcessor`]'s
/// atomic runtime control. Exists mainly so chain tests have a processor
/// whose output is trivial to predict by hand.
pub struct GainDsp {
    gain: f32,
}

impl GainDsp {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl DspProcessor for GainDsp {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Gain"
    }
}
