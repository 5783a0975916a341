//! Byte Sources Feeding the Acquirer

use crate::timer::TimerTask;
use frame_protocol::LinkError;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::mpsc::{Receiver, TryRecvError};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

/// Input link polled by the main loop.
///
/// `poll_byte` mirrors checking the receive-complete flag: it never blocks and
/// returns `Ok(None)` while no byte is ready.
pub trait ByteSource {
    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError>;

    /// Spin until a byte arrives
    fn read_byte(&mut self) -> Result<u8, LinkError> {
        loop {
            if let Some(byte) = self.poll_byte()? {
                return Ok(byte);
            }
            std::hint::spin_loop();
        }
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        (**self).poll_byte()
    }
}

/// One scripted event on a fake link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Byte(u8),
    /// Silence lasting this many timer ticks
    Gap(u16),
}

/// In-memory link that replays a script.
///
/// Each poll during a [`Step::Gap`] fires one timer tick, so timeouts play
/// out deterministically. The link reports [`LinkError::Closed`] once the
/// script runs dry.
#[derive(Debug)]
pub struct ScriptedSource {
    timer: TimerTask,
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new(timer: TimerTask, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            timer,
            steps: steps.into_iter().collect(),
        }
    }

    /// Script of back-to-back bytes with no gaps
    pub fn from_bytes(timer: TimerTask, bytes: &[u8]) -> Self {
        Self::new(timer, bytes.iter().map(|&b| Step::Byte(b)))
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push_back(step);
    }

    pub fn extend_bytes(&mut self, bytes: &[u8]) {
        self.steps.extend(bytes.iter().map(|&b| Step::Byte(b)));
    }

    /// Steps not consumed yet
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl ByteSource for ScriptedSource {
    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        loop {
            match self.steps.front_mut() {
                None => return Err(LinkError::Closed),
                Some(Step::Byte(byte)) => {
                    let byte = *byte;
                    self.steps.pop_front();
                    return Ok(Some(byte));
                }
                Some(Step::Gap(0)) => {
                    self.steps.pop_front();
                }
                Some(Step::Gap(ticks)) => {
                    *ticks -= 1;
                    self.timer.on_tick();
                    return Ok(None);
                }
            }
        }
    }
}

/// Bytes handed over from another thread, e.g. the ECU emulator
impl ByteSource for Receiver<u8> {
    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        match self.try_recv() {
            Ok(byte) => Ok(Some(byte)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(LinkError::Closed),
        }
    }
}

/// Open `device` at 8N1 without flow control
pub fn open_serial(device: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, LinkError> {
    let port = tokio_serial::new(device, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open()
        .map_err(|e| LinkError::Open {
            device: device.to_string(),
            reason: e.to_string(),
        })?;
    info!("Opened {} at {} baud", device, baud_rate);
    Ok(port)
}

/// Serial input polled through the driver's receive queue
pub struct SerialSource {
    port: Box<dyn SerialPort>,
}

impl SerialSource {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl ByteSource for SerialSource {
    fn poll_byte(&mut self) -> Result<Option<u8>, LinkError> {
        let queued = self
            .port
            .bytes_to_read()
            .map_err(|e| LinkError::Io(e.into()))?;
        if queued == 0 {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(Some(byte[0]))
    }
}
