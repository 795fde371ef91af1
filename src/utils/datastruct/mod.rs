pub mod bit_vec;
