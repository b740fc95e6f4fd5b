use burn::tensor::{Tensor, backend::Backend};

/// Compute the Gram matrix of an activation tensor.
///
/// The spatial dimensions are flattened into a single positions axis, giving a
/// `[channels, positions]` feature matrix `F` per batch item. The result is `F · Fᵀ`
/// divided by the number of spatial positions, so layers of different resolution
/// contribute on a comparable scale.
///
/// # Shapes
///
/// - activation: `[batch, channels, height, width]`
/// - output: `[batch, channels, channels]`
pub fn gram_matrix<B: Backend>(activation: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, channels, height, width] = activation.dims();
    let positions = height * width;

    let features = activation.reshape([batch, channels, positions]);
    let features_t = features.clone().swap_dims(1, 2);

    features.matmul(features_t).div_scalar(positions as f32)
}
