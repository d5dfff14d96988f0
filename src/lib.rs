pub mod bus;
pub mod clock;
pub mod config;
pub mod cpu;
pub mod error;
pub mod keyboard;
pub mod machine;
pub mod memory;
pub mod renderer;
pub mod snapshot;
pub mod sound;
pub mod ula;
pub mod utils;

pub use bus::Bus;
pub use config::Config;
pub use cpu::{Cpu, CpuBus, Registers};
pub use error::CoreError;
pub use keyboard::{Key, Keyboard};
pub use machine::{Machine, MachineBuilder, MachineState};
pub use renderer::Renderer;
pub use snapshot::Snapshot;
pub use sound::{beeper, AudioOutput, BeeperHandle, BeeperSource};
pub use utils::hexdump;

use js_sys::{Float32Array, Uint8ClampedArray};
use once_cell::sync::OnceCell;
use wasm_bindgen::prelude::*;

static LOGGING: OnceCell<()> = OnceCell::new();

fn init_logging() {
    LOGGING.get_or_init(|| {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    });
}

fn parse_config(config_json: Option<String>) -> Result<Config, JsError> {
    match config_json {
        Some(json) => Config::from_json(&json).map_err(|err| JsError::new(&format!("{:#}", err))),
        None => Ok(Config::default()),
    }
}

#[wasm_bindgen(js_name = Screen)]
pub struct JsScreen(Renderer);

#[wasm_bindgen(js_class = Screen)]
impl JsScreen {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<JsScreen, JsError> {
        init_logging();
        Ok(Self(Renderer::new(&parse_config(config_json)?)))
    }

    /// Decodes 6912 bytes of screen memory into RGBA pixels.
    pub fn decode(
        &mut self,
        screen: &[u8],
        border: u8,
        flash: bool,
    ) -> Result<Uint8ClampedArray, JsError> {
        self.0.draw(screen, border, flash)?;
        Ok(Uint8ClampedArray::from(self.0.screen_buffer.as_slice()))
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> usize {
        self.0.width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> usize {
        self.0.height()
    }
}

#[wasm_bindgen(js_name = Keyboard)]
pub struct JsKeyboard(Keyboard);

#[wasm_bindgen(js_class = Keyboard)]
impl JsKeyboard {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        init_logging();
        Self(Keyboard::new())
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, code: u32) -> bool {
        self.0.key_down(code)
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, code: u32) -> bool {
        self.0.key_up(code)
    }

    /// What an IN from `port` would read.
    pub fn query(&self, port: u16) -> u8 {
        self.0.query(port)
    }
}

impl Default for JsKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(js_name = Beeper)]
pub struct JsBeeper {
    handle: BeeperHandle,
    source: BeeperSource,
}

#[wasm_bindgen(js_class = Beeper)]
impl JsBeeper {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<JsBeeper, JsError> {
        init_logging();
        let (handle, source) = beeper(&parse_config(config_json)?);
        Ok(Self { handle, source })
    }

    #[wasm_bindgen(js_name = notifyTransition)]
    pub fn notify_transition(&self, time_ms: f64) {
        self.handle.notify_transition(time_ms);
    }

    /// Next `len` samples, meant to be called from the audio callback.
    pub fn render(&self, len: usize) -> Float32Array {
        Float32Array::from(self.source.render_vec(len).as_slice())
    }
}
