use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

/// Browser handle to one editing session.
#[wasm_bindgen]
pub struct Editor { pub(crate) inner: branchflow::Editor }

impl Editor {
    pub fn rs_new() -> Editor { Editor { inner: branchflow::Editor::new() } }
    pub fn rs_version(&self) -> u64 { self.inner.version() }
}
