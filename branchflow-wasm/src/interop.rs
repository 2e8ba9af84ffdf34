use branchflow::{FlowArrays, StageArrays};
use js_sys::{Float32Array, Object, Reflect, Uint32Array, Uint8Array};
use wasm_bindgen::JsValue;

pub fn new_obj() -> Object { Object::new() }
pub fn set_kv(obj: &Object, k: &str, v: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(k), v);
}
pub fn arr_u32(slice: &[u32]) -> Uint32Array {
    let arr = Uint32Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}
pub fn arr_f32(slice: &[f32]) -> Float32Array {
    let arr = Float32Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}
pub fn arr_u8(slice: &[u8]) -> Uint8Array {
    let arr = Uint8Array::new_with_length(slice.len() as u32);
    arr.copy_from(slice); arr
}

pub fn stage_data(sa: &StageArrays) -> JsValue {
    let obj = new_obj();
    set_kv(&obj, "ids", &arr_u32(&sa.ids).into());
    set_kv(&obj, "rects", &arr_f32(&sa.rects).into());
    set_kv(&obj, "rgba", &arr_u8(&sa.rgba).into());
    obj.into()
}

pub fn flow_data(fa: &FlowArrays) -> JsValue {
    let obj = new_obj();
    set_kv(&obj, "ids", &arr_u32(&fa.ids).into());
    set_kv(&obj, "endpoints", &arr_u32(&fa.endpoints).into());
    set_kv(&obj, "geometry", &arr_f32(&fa.geometry).into());
    set_kv(&obj, "widths", &arr_f32(&fa.widths).into());
    set_kv(&obj, "rgba", &arr_u8(&fa.rgba).into());
    obj.into()
}
