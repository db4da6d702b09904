pub mod team_balance;
