use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use tokenizers::{Encoding, Tokenizer};

/// XLM-RoBERTa `<pad>` id.
const PAD_ID: u32 = 1;

/// `[1, max_len]` tensors for one encoding: ids, attention mask, token types.
pub struct EncodedInput {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

fn to_device(enc: &Encoding, max_len: usize, device: &Device) -> Result<EncodedInput> {
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    let pad = max_len - ids.len();
    ids.extend(std::iter::repeat(PAD_ID).take(pad));
    mask.extend(std::iter::repeat(0).take(pad));
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    let token_type_ids = Tensor::zeros((1, max_len), DType::I64, device)?;
    Ok(EncodedInput { input_ids, attention_mask, token_type_ids })
}

pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<EncodedInput> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    to_device(&enc, max_len, device)
}

/// Encode a `(query, document)` pair the way cross-encoders expect.
pub fn tokenize_pair_on_device(tokenizer: &Tokenizer, query: &str, document: &str, max_len: usize, device: &Device) -> Result<EncodedInput> {
    let enc = tokenizer.encode((query, document), true).map_err(|e| anyhow!("Pair tokenization failed: {}", e))?;
    to_device(&enc, max_len, device)
}
