pub mod inference;

pub use inference::{
    infer_delta, infer_schedule, infer_time_unit, infer_timezone, Inference,
    InferenceError, TimeUnit,
};
