mod games;
mod leaderboards;
mod players;
