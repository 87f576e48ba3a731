//! Gain stage for interleaved 16-bit little-endian PCM

/// Lowest allowed volume (mute)
pub const MIN_VOLUME: f32 = 0.0;
/// Highest allowed volume (200%)
pub const MAX_VOLUME: f32 = 2.0;
/// Amount a single volume up/down command moves the level
pub const VOLUME_STEP: f32 = 0.1;

/// Scale every sample in `buffer` by `gain`, in place.
///
/// Products outside the `i16` range saturate at `i16::MIN`/`i16::MAX` instead
/// of wrapping, and a NaN gain produces silence. A trailing odd byte is left
/// as it is.
pub fn scale(buffer: &mut [u8], gain: f32) {
  for pair in buffer.chunks_exact_mut(2) {
    let sample = i16::from_le_bytes([pair[0], pair[1]]);
    // float -> int `as` casts truncate toward zero and saturate
    let adjusted = (f32::from(sample) * gain) as i16;
    pair.copy_from_slice(&adjusted.to_le_bytes());
  }
}

/// Clamp a volume level into the allowed range, treating NaN as mute.
pub fn clamp_volume(level: f32) -> f32 {
  if level.is_nan() {
    return MIN_VOLUME;
  }
  level.clamp(MIN_VOLUME, MAX_VOLUME)
}

/// Apply `steps` volume steps to `level` and clamp the result.
///
/// The result is rounded to one decimal so repeated steps don't accumulate
/// float drift (ten steps up from 1.0 lands exactly on 2.0).
pub fn step_volume(level: f32, steps: i32) -> f32 {
  let raw = level + VOLUME_STEP * steps as f32;
  clamp_volume((raw * 10.0).round() / 10.0)
}

/// Volume as a whole percentage for display
pub fn volume_percent(level: f32) -> u32 {
  (clamp_volume(level) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn unity_gain_leaves_samples_unchanged() {
    let mut data = [0x01, 0x00, 0x02, 0x00];
    scale(&mut data, 1.0);
    assert_eq!(data, [0x01, 0x00, 0x02, 0x00]);
  }

  #[test]
  fn half_gain_halves_samples() {
    let mut data = [0x04, 0x00, 0x08, 0x00];
    scale(&mut data, 0.5);
    assert_eq!(data, [0x02, 0x00, 0x04, 0x00]);
  }

  #[test]
  fn double_gain_doubles_samples() {
    let mut data = [0x01, 0x00, 0x02, 0x00];
    scale(&mut data, 2.0);
    assert_eq!(data, [0x02, 0x00, 0x04, 0x00]);
  }

  #[test]
  fn zero_gain_mutes() {
    let mut data = [0x01, 0x00, 0x02, 0x00];
    scale(&mut data, 0.0);
    assert_eq!(data, [0x00; 4]);
  }

  #[test]
  fn negative_samples_keep_their_sign() {
    let mut data = (-1000i16).to_le_bytes();
    scale(&mut data, 0.5);
    assert_eq!(i16::from_le_bytes(data), -500);
  }

  #[test]
  fn loud_samples_saturate_instead_of_wrapping() {
    let mut data = [0u8; 4];
    data[..2].copy_from_slice(&20_000i16.to_le_bytes());
    data[2..].copy_from_slice(&(-20_000i16).to_le_bytes());
    scale(&mut data, 2.0);
    assert_eq!(i16::from_le_bytes([data[0], data[1]]), i16::MAX);
    assert_eq!(i16::from_le_bytes([data[2], data[3]]), i16::MIN);
  }

  #[test]
  fn trailing_odd_byte_is_untouched() {
    let mut data = [0x04, 0x00, 0x7f];
    scale(&mut data, 0.5);
    assert_eq!(data, [0x02, 0x00, 0x7f]);
  }

  #[test]
  fn out_of_range_gains_do_not_panic() {
    let mut data = [0xff, 0x7f, 0x00, 0x80];
    scale(&mut data, f32::NAN);
    assert_eq!(data, [0x00; 4]);
    let mut data = [0x10, 0x00];
    scale(&mut data, -3.0);
    assert_eq!(i16::from_le_bytes(data), -48);
    let mut data = [0x10, 0x00];
    scale(&mut data, f32::INFINITY);
    assert_eq!(i16::from_le_bytes(data), i16::MAX);
  }

  #[test]
  fn ten_steps_up_reach_the_ceiling_exactly() {
    let mut level = 1.0;
    for _ in 0..10 {
      level = step_volume(level, 1);
    }
    assert_eq!(level, MAX_VOLUME);
    assert_eq!(volume_percent(level), 200);
    assert_eq!(step_volume(level, 1), MAX_VOLUME);
  }

  #[test]
  fn stepping_below_zero_mutes() {
    assert_eq!(step_volume(0.05, -1), MIN_VOLUME);
    assert_eq!(step_volume(0.0, -1), MIN_VOLUME);
  }

  proptest! {
    #[test]
    fn volume_stays_in_range_for_any_step_sequence(
      steps in proptest::collection::vec(prop_oneof![Just(1i32), Just(-1i32)], 0..200)
    ) {
      let mut level = 1.0;
      for step in steps {
        level = step_volume(level, step);
        prop_assert!((MIN_VOLUME..=MAX_VOLUME).contains(&level));
      }
    }
  }
}
