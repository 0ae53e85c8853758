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
use rewardgate_core::track::RewardTrack;

fuzz_target!(|data: &[u8]| {
    if let Ok(track) = serde_json::from_slice::<RewardTrack>(data) {
        let _ = track.is_unlocked(0);
        if let Some(pre) = track.precondition.as_ref() {
            let calldata = pre.calldata(&rewardgate_core::address::WalletAddress::from_bytes([0; 20]));
            assert_eq!(calldata.len(), 36);
        }
    }
});
