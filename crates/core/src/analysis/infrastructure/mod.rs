pub mod execution_provider;
pub mod model_store;
pub mod onnx_attribute_analyzer;
pub mod onnx_classifiers;
pub mod replay_analyzer;
pub mod yolo_face_locator;
