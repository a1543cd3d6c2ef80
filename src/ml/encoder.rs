// ============================================================
// Layer 5 — Shared Sequence Encoder
// ============================================================
// A BERT-style transformer encoder shared by every task head.
//
//   token ids ──► token emb + position emb ──► LayerNorm ──► dropout
//             ──► N × [ self-attention (padding masked) → add & norm
//                      → GELU feed-forward            → add & norm ]
//             ──► hidden_states          [batch, seq, hidden]
//             ──► tanh(dense(hidden[:, 0]))  = pooled  [batch, hidden]
//
// The pooled vector summarises the whole sequence from the
// hidden state of its first ([CLS]) token.
//
// The rest of the model only sees the SequenceEncoder trait,
// so another encoder (e.g. one with pretrained weights in a
// different layout) can be dropped in behind it.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, tanh},
};

/// Output of one encoder pass
pub struct EncoderOutput<B: Backend> {
    /// Per-token states: [batch, seq_len, hidden_size]
    pub hidden_states: Tensor<B, 3>,
    /// One summary vector per sequence: [batch, hidden_size]
    pub pooled:        Tensor<B, 2>,
}

/// Maps token ids + attention mask to per-token and pooled states.
/// Works the same whether or not the parameters track gradients.
pub trait SequenceEncoder<B: Backend> {
    /// Width of the pooled representation
    fn hidden_size(&self) -> usize;

    /// token_ids / attention_mask: [batch, seq_len]; mask 1 = real token
    fn encode(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> EncoderOutput<B>;
}

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub hidden_size: usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub dropout:     f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerEncoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.hidden_size).init(device);
        let embedding_norm     = LayerNormConfig::new(self.hidden_size).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler  = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        TransformerEncoder {
            token_embedding, position_embedding, embedding_norm, layers, pooler, dropout,
            hidden_size: self.hidden_size,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.hidden_size).init(device);
        let norm1   = LayerNormConfig::new(self.hidden_size).init(device);
        let norm2   = LayerNormConfig::new(self.hidden_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// mask_pad: [batch, seq_len], true where the position is padding
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(mask_pad);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub embedding_norm:     LayerNorm<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub pooler:             Linear<B>,
    pub dropout:            Dropout,
    pub hidden_size:        usize,
}

impl<B: Backend> SequenceEncoder<B> for TransformerEncoder<B> {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn encode(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> EncoderOutput<B> {
        let [batch_size, seq_len] = token_ids.dims();
        let device = token_ids.device();

        let tok_emb   = self.token_embedding.forward(token_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb   = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(self.embedding_norm.forward(tok_emb + pos_emb));

        // Attention must not look at padding
        let mask_pad = attention_mask.equal_elem(0);
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
        }

        let first_token = x
            .clone()
            .slice([0..batch_size, 0..1, 0..self.hidden_size])
            .reshape([batch_size, self.hidden_size]);
        let pooled = tanh(self.pooler.forward(first_token));

        EncoderOutput { hidden_states: x, pooled }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn tiny() -> EncoderConfig {
        EncoderConfig::new(50, 16, 8, 2, 2, 16, 0.0)
    }

    fn ids(rows: Vec<i64>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::new(rows, shape), &Default::default())
    }

    #[test]
    fn test_output_shapes() {
        let encoder = tiny().init::<TestBackend>(&Default::default());
        let out = encoder.encode(
            ids(vec![1, 5, 6, 2, 1, 7, 2, 0], [2, 4]),
            ids(vec![1, 1, 1, 1, 1, 1, 1, 0], [2, 4]),
        );
        assert_eq!(out.hidden_states.dims(), [2, 4, 8]);
        assert_eq!(out.pooled.dims(), [2, 8]);
        assert_eq!(encoder.hidden_size(), 8);
    }

    #[test]
    fn test_padding_does_not_change_pooled_output() {
        let encoder = tiny().init::<TestBackend>(&Default::default());

        let short = encoder.encode(ids(vec![1, 5, 2], [1, 3]), ids(vec![1, 1, 1], [1, 3]));
        let padded = encoder.encode(
            ids(vec![1, 5, 2, 0, 0], [1, 5]),
            ids(vec![1, 1, 1, 0, 0], [1, 5]),
        );

        let a: Vec<f32> = short.pooled.into_data().to_vec().unwrap();
        let b: Vec<f32> = padded.pooled.into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }
}
