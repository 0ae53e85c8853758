// Copyright [2026] [RewardGate Contributors]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! rewardgate-core
//!
//! I/O-free building blocks of the claim-authorization pipeline:
//! - canonical wallet addresses and claim identities
//! - reward tracks and UTC claim-period arithmetic
//! - the packed voucher message and its recoverable signature
//! - the error taxonomy shared with the daemon

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod address;
pub mod error;
pub mod period;
pub mod track;
pub mod voucher;
