//! Keyed substitution/permutation network ("aems" cipher)
//!
//! Every table is derived from a ChaCha20 stream seeded with the key: an S-box,
//! a byte shuffle, a mixing seed and one round key per round. A round is
//! SubBytes, ShiftBytes, Mix, AddRoundKey.

use cbc::cipher::consts::{U1, U16};
use cbc::cipher::inout::InOut;
use cbc::cipher::{
    Block, BlockBackend, BlockCipher, BlockClosure, BlockDecrypt, BlockEncrypt, BlockSizeUser,
    ParBlocksSizeUser,
};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::cbc::CbcContext;
use super::{BlockCipherProvider, CipherContext, BLOCK_LEN};
use crate::keys::Key;
use crate::Result;

const ROUNDS: usize = 8;

#[derive(Debug, Default, Clone, Copy)]
pub struct PermutationProvider;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct PermutationBlock {
    sbox: [u8; 256],
    inv_sbox: [u8; 256],
    shift: [u8; BLOCK_LEN],
    inv_shift: [u8; BLOCK_LEN],
    mix_seed: u8,
    round_keys: [[u8; BLOCK_LEN]; ROUNDS],
}

impl PermutationBlock {
    fn from_key(key: &Key) -> Self {
        let key_bytes = key.as_bytes();
        let mut rng = ChaCha20Rng::from_seed(*key_bytes);

        let mut sbox = [0u8; 256];
        for (i, b) in sbox.iter_mut().enumerate() {
            *b = i as u8;
        }
        sbox.shuffle(&mut rng);
        let mut inv_sbox = [0u8; 256];
        for (i, &b) in sbox.iter().enumerate() {
            inv_sbox[b as usize] = i as u8;
        }

        let mut shift = [0u8; BLOCK_LEN];
        for (i, s) in shift.iter_mut().enumerate() {
            *s = i as u8;
        }
        shift.shuffle(&mut rng);
        let mut inv_shift = [0u8; BLOCK_LEN];
        for (i, &s) in shift.iter().enumerate() {
            inv_shift[s as usize] = i as u8;
        }

        // Odd and non-zero
        let mix_seed = (rng.next_u32() % 255) as u8 | 1;

        let mut round_keys = [[0u8; BLOCK_LEN]; ROUNDS];
        for round_key in round_keys.iter_mut() {
            for (i, k) in round_key.iter_mut().enumerate() {
                *k = key_bytes[i] ^ (rng.next_u32() & 0xFF) as u8;
            }
        }

        Self {
            sbox,
            inv_sbox,
            shift,
            inv_shift,
            mix_seed,
            round_keys,
        }
    }

    fn mix(&self, state: &mut [u8]) {
        for i in 0..BLOCK_LEN - 1 {
            state[i] ^= state[i + 1] ^ self.mix_seed;
        }
    }

    fn inv_mix(&self, state: &mut [u8]) {
        for i in (0..BLOCK_LEN - 1).rev() {
            state[i] ^= state[i + 1] ^ self.mix_seed;
        }
    }

    fn permute(state: &mut [u8], table: &[u8; BLOCK_LEN]) {
        let mut tmp = [0u8; BLOCK_LEN];
        for (t, &from) in tmp.iter_mut().zip(table) {
            *t = state[from as usize];
        }
        state.copy_from_slice(&tmp);
    }

    fn encrypt_state(&self, state: &mut [u8]) {
        for round_key in &self.round_keys {
            for b in state.iter_mut() {
                *b = self.sbox[*b as usize];
            }
            Self::permute(state, &self.shift);
            self.mix(state);
            for (b, k) in state.iter_mut().zip(round_key) {
                *b ^= k;
            }
        }
    }

    fn decrypt_state(&self, state: &mut [u8]) {
        for round_key in self.round_keys.iter().rev() {
            for (b, k) in state.iter_mut().zip(round_key) {
                *b ^= k;
            }
            self.inv_mix(state);
            Self::permute(state, &self.inv_shift);
            for b in state.iter_mut() {
                *b = self.inv_sbox[*b as usize];
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Block cipher traits, so the block plugs into the `cbc` mode
// ---------------------------------------------------------------------------

impl BlockSizeUser for PermutationBlock {
    type BlockSize = U16;
}

impl BlockCipher for PermutationBlock {}

impl BlockEncrypt for PermutationBlock {
    fn encrypt_with_backend(&self, f: impl BlockClosure<BlockSize = U16>) {
        f.call(&mut Encrypting(self));
    }
}

impl BlockDecrypt for PermutationBlock {
    fn decrypt_with_backend(&self, f: impl BlockClosure<BlockSize = U16>) {
        f.call(&mut Decrypting(self));
    }
}

struct Encrypting<'a>(&'a PermutationBlock);
struct Decrypting<'a>(&'a PermutationBlock);

impl BlockSizeUser for Encrypting<'_> {
    type BlockSize = U16;
}

impl ParBlocksSizeUser for Encrypting<'_> {
    type ParBlocksSize = U1;
}

impl BlockBackend for Encrypting<'_> {
    fn proc_block(&mut self, mut block: InOut<'_, '_, Block<Self>>) {
        let mut state = block.clone_in();
        self.0.encrypt_state(&mut state);
        *block.get_out() = state;
    }
}

impl BlockSizeUser for Decrypting<'_> {
    type BlockSize = U16;
}

impl ParBlocksSizeUser for Decrypting<'_> {
    type ParBlocksSize = U1;
}

impl BlockBackend for Decrypting<'_> {
    fn proc_block(&mut self, mut block: InOut<'_, '_, Block<Self>>) {
        let mut state = block.clone_in();
        self.0.decrypt_state(&mut state);
        *block.get_out() = state;
    }
}

impl BlockCipherProvider for PermutationProvider {
    fn name(&self) -> &'static str {
        "aems"
    }

    fn create_context(&self, key: &Key) -> Result<Box<dyn CipherContext>> {
        Ok(Box::new(CbcContext::new(PermutationBlock::from_key(key))))
    }
}
