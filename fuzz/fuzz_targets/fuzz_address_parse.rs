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
#![no_main]

use libfuzzer_sys::fuzz_target;
use rewardgate_core::address::{normalize_address, WalletAddress};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(addr) = WalletAddress::parse(raw) {
        let normalized = addr.normalized();
        assert_eq!(normalized.len(), 42);
        assert_eq!(normalize_address(&normalized).ok(), Some(normalized.clone()));
        assert_eq!(WalletAddress::parse(&normalized).ok(), Some(addr));
    }
});
