//! 測試共用的固定 ID

use uuid::Uuid;

pub const JOURNAL_ID: Uuid = Uuid::from_u128(0xb125f5a0_e803_11f0_a078_069b540ea27c);
pub const TRAN_CODE_ID: Uuid = Uuid::from_u128(0x4e6acb34_7ecf_48d3_9892_df400be1998e);
/// Ernie
pub const ACCOUNT1_ID: Uuid = Uuid::from_u128(0x1fd1dd3e_33fe_4ef5_9d58_676ef8d306b5);
/// Bert
pub const ACCOUNT2_ID: Uuid = Uuid::from_u128(0x6c6affb0_5cf5_402b_8d84_01bfc1624a2c);

/// 區分租戶的 header
pub const ACCOUNT_HEADER: &str = "x-twisp-account-id";
