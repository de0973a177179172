// Deterministic hash-derived embeddings
// Maps text to a fixed-dimension vector as a pure function of the string's
// MD5 digest. This is not a semantic embedding: similarity between vectors
// reflects hash similarity only. It exists to exercise the retrieval
// pipeline without an external model dependency, and downstream behavior
// depends on its bit-exact reproducibility for identical input text.

#[cfg(test)]
mod tests;

/// Dimension of every embedding vector produced by this module.
pub const EMBEDDING_DIM: usize = 1536;

#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    /// Embed a text string into a 1536-dimensional vector with every
    /// element in [-1, 1).
    ///
    /// The text is lowercased, MD5-hashed, and the hex digest (repeated
    /// until it covers all dimensions) is read off in equal-width windows,
    /// each parsed base-16 and normalized from [0, 1) to [-1, 1). Equal
    /// lowercased inputs yield bit-identical vectors.
    #[inline]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let normalized = text.to_lowercase();
        let mut hex = format!("{:x}", md5::compute(normalized.as_bytes()));

        let mut step = hex.len() / EMBEDDING_DIM;
        if step == 0 {
            hex = hex.repeat(EMBEDDING_DIM / hex.len() + 1);
            step = hex.len() / EMBEDDING_DIM;
        }

        let scale = 16f64.powi(step as i32);
        let mut vector = Vec::with_capacity(EMBEDDING_DIM);

        let mut offset = 0;
        while offset < hex.len() - step && vector.len() < EMBEDDING_DIM {
            let window = &hex[offset..offset + step];
            let value = u128::from_str_radix(window, 16).unwrap_or(0);
            vector.push(((value as f64 / scale) * 2.0 - 1.0) as f32);
            offset += step;
        }

        // Integer-division truncation can leave the vector short
        vector.resize(EMBEDDING_DIM, 0.0);
        vector
    }

    /// Embed each text independently. The embedder is pure and stateless,
    /// so there is no cross-text interaction.
    #[inline]
    pub fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed(text.as_ref())).collect()
    }
}
