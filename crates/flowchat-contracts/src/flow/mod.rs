mod normalize;
mod request;

pub use normalize::{
    normalize_response, NormalizedResponse, ResponseShape, RESPONSE_SHAPES, UNRECOGNIZED_SHAPE,
};
pub use request::{flow_run_url, with_image_tweak, FlowRequest, Tweaks, DEFAULT_IO_TYPE};
